use std::ops::RangeInclusive;

/// Metadata detail level extracted from the PDF info dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataVerbosity {
    /// Title and author only.
    Minimal,
    /// Title, author and creation date.
    Standard,
}

/// Runtime options for PDF processing.
#[derive(Debug, Clone)]
pub struct PdfProcessOptions {
    /// Optional inclusive 1-based page range.
    pub page_range: Option<RangeInclusive<usize>>,
    /// Metadata detail level.
    pub metadata_verbosity: MetadataVerbosity,
}

impl Default for PdfProcessOptions {
    fn default() -> Self {
        Self {
            page_range: None,
            metadata_verbosity: MetadataVerbosity::Minimal,
        }
    }
}

/// Text and metadata extracted from one PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedDocument {
    /// Source identifier (path or virtual label).
    pub source: String,
    /// Total pages in the original PDF.
    pub page_count: usize,
    /// Extracted document metadata.
    pub metadata: DocumentMeta,
    /// Per-page text in page order.
    pub pages: Vec<Page>,
}

impl ProcessedDocument {
    /// Concatenates every non-empty page, separated by a blank line.
    #[must_use]
    pub fn text(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.text.as_str())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Returns `true` when no page produced any text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|page| page.text.is_empty())
    }
}

/// Minimal PDF metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMeta {
    /// Optional title from PDF info dictionary.
    pub title: Option<String>,
    /// Optional author from PDF info dictionary.
    pub author: Option<String>,
    /// Optional creation date when standard verbosity is enabled.
    pub creation_date: Option<String>,
}

/// Parsed page in normalized text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based page index in selected output set.
    pub index: usize,
    /// Original 1-based page number in source PDF.
    pub source_page: u32,
    /// Normalized page text.
    pub text: String,
    /// Character count of the text.
    pub text_chars: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(index: usize, text: &str) -> Page {
        Page {
            index,
            source_page: u32::try_from(index).unwrap(),
            text: text.to_string(),
            text_chars: text.chars().count(),
        }
    }

    #[test]
    fn text_skips_blank_pages() {
        let doc = ProcessedDocument {
            source: "memory".into(),
            page_count: 3,
            metadata: DocumentMeta::default(),
            pages: vec![page(1, "first"), page(2, ""), page(3, "third")],
        };
        assert_eq!(doc.text(), "first\n\nthird");
        assert!(!doc.is_blank());
    }

    #[test]
    fn blank_document() {
        let doc = ProcessedDocument {
            source: "memory".into(),
            page_count: 1,
            metadata: DocumentMeta::default(),
            pages: vec![page(1, "")],
        };
        assert!(doc.is_blank());
        assert_eq!(doc.text(), "");
    }
}
