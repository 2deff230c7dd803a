//! Text normalization applied to extracted documents before chunking.

use crate::types::Document;

/// A document normalization step.
pub trait Cleaner: Send + Sync {
    /// Returns a normalized copy of `doc`, keeping its id and metadata.
    fn clean(&self, doc: &Document) -> Document;

    /// Returns the cleaner name.
    fn name(&self) -> &'static str;
}

/// Default cleaner for text pulled out of PDFs.
///
/// - normalizes line endings (`\r\n`, `\r` -> `\n`)
/// - replaces non-breaking spaces and drops other control characters
/// - trims trailing whitespace on each line
/// - keeps at most one blank line between paragraphs, so `"\n\n"` stays a paragraph break
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicCleaner;

impl BasicCleaner {
    fn normalize_characters(text: &str) -> String {
        let unified = text.replace("\r\n", "\n").replace('\r', "\n");
        unified
            .chars()
            .filter_map(|c| match c {
                '\u{a0}' | '\t' => Some(' '),
                '\n' => Some('\n'),
                c if c.is_control() => None,
                c => Some(c),
            })
            .collect()
    }

    fn collapse_blank_lines(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut pending_break = false;

        for line in text.lines().map(str::trim_end) {
            if line.trim().is_empty() {
                pending_break = !out.is_empty();
                continue;
            }
            if !out.is_empty() {
                out.push('\n');
                if pending_break {
                    out.push('\n');
                }
            }
            out.push_str(line);
            pending_break = false;
        }

        out
    }
}

impl Cleaner for BasicCleaner {
    fn clean(&self, doc: &Document) -> Document {
        let normalized = Self::normalize_characters(&doc.text);
        let collapsed = Self::collapse_blank_lines(&normalized);

        Document::with_metadata(
            doc.id.clone(),
            collapsed.trim().to_string(),
            doc.metadata.clone(),
        )
    }

    fn name(&self) -> &'static str {
        "basic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_text() {
        let doc = Document::new("d1", "a\r\n\r\n\r\n b  \n\n\n\nc");
        let cleaned = BasicCleaner.clean(&doc);
        assert_eq!(cleaned.text, "a\n\n b\n\nc");
    }

    #[test]
    fn strips_control_characters() {
        let doc = Document::new("d1", "one\u{a0}two\u{0c}\tthree\u{0}");
        let cleaned = BasicCleaner.clean(&doc);
        assert_eq!(cleaned.text, "one two three");
    }

    #[test]
    fn keeps_id_and_metadata() {
        let doc = Document::new("report.pdf", "  body  ");
        let cleaned = BasicCleaner.clean(&doc);
        assert_eq!(cleaned.id, "report.pdf");
        assert_eq!(cleaned.source(), Some("report.pdf"));
        assert_eq!(cleaned.text, "body");
    }
}
