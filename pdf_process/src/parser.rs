use std::path::Path;

use lopdf::Document;

use crate::error::{PdfProcessError, Result};
use crate::model::{DocumentMeta, MetadataVerbosity, Page, PdfProcessOptions, ProcessedDocument};

pub(crate) fn parse_from_path(
    path: &Path,
    options: &PdfProcessOptions,
) -> Result<ProcessedDocument> {
    let doc = Document::load(path).map_err(|e| PdfProcessError::Parse(e.to_string()))?;
    Ok(parse_document(&doc, path.display().to_string(), options))
}

pub(crate) fn parse_from_bytes(
    bytes: &[u8],
    source_name: &str,
    options: &PdfProcessOptions,
) -> Result<ProcessedDocument> {
    let doc = Document::load_mem(bytes).map_err(|e| PdfProcessError::Parse(e.to_string()))?;
    Ok(parse_document(&doc, source_name.to_string(), options))
}

fn parse_document(doc: &Document, source: String, options: &PdfProcessOptions) -> ProcessedDocument {
    let page_map = doc.get_pages();
    let mut page_numbers: Vec<u32> = page_map.keys().copied().collect();
    page_numbers.sort_unstable();

    let selected = select_pages(&page_numbers, options.page_range.clone());
    let mut pages = Vec::with_capacity(selected.len());

    for (idx, page_number) in selected.iter().enumerate() {
        let text = match doc.extract_text(&[*page_number]) {
            Ok(raw) => normalize_text(&raw),
            Err(err) => {
                tracing::debug!(%source, page = page_number, error = %err, "page text extraction failed");
                String::new()
            }
        };

        pages.push(Page {
            index: idx + 1,
            source_page: *page_number,
            text_chars: text.chars().count(),
            text,
        });
    }

    ProcessedDocument {
        metadata: extract_metadata(doc, options.metadata_verbosity),
        page_count: page_numbers.len(),
        source,
        pages,
    }
}

fn select_pages(pages: &[u32], range: Option<std::ops::RangeInclusive<usize>>) -> Vec<u32> {
    match range {
        None => pages.to_vec(),
        Some(range) => pages
            .iter()
            .enumerate()
            .filter_map(|(idx, p)| range.contains(&(idx + 1)).then_some(*p))
            .collect(),
    }
}

pub(crate) fn normalize_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn extract_metadata(doc: &Document, verbosity: MetadataVerbosity) -> DocumentMeta {
    let mut meta = DocumentMeta::default();
    if let Ok(info_ref) = doc.trailer.get(b"Info")
        && let Ok(info_ref) = info_ref.as_reference()
        && let Ok(dict) = doc.get_dictionary(info_ref)
    {
        let field = |key: &[u8]| {
            dict.get(key)
                .ok()
                .and_then(|v| v.as_str().ok())
                .map(to_clean_string)
                .filter(|value| !value.is_empty())
        };
        meta.title = field(b"Title");
        meta.author = field(b"Author");
        if matches!(verbosity, MetadataVerbosity::Standard) {
            meta.creation_date = field(b"CreationDate");
        }
    }
    meta
}

fn to_clean_string(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}
