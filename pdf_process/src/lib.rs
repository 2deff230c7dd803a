//! PDF text extraction for retrieval ingestion.
//!
//! This crate turns a PDF (from disk or from memory) into normalized per-page text plus
//! the handful of info-dictionary fields useful for citations.
//!
//! ```rust,no_run
//! use ragbot_pdf::{PdfProcessOptions, PdfProcessor};
//!
//! # fn main() -> ragbot_pdf::Result<()> {
//! let processed = PdfProcessor::from_path("report.pdf").extract(&PdfProcessOptions::default())?;
//! println!("{} pages, title = {:?}", processed.page_count, processed.metadata.title);
//! println!("{}", processed.text());
//! # Ok(())
//! # }
//! ```

mod error;
mod model;
mod parser;

pub use error::{PdfProcessError, Result};
pub use model::{DocumentMeta, MetadataVerbosity, Page, PdfProcessOptions, ProcessedDocument};

use std::path::{Path, PathBuf};

/// PDF processor entrypoint.
#[derive(Debug, Clone)]
pub struct PdfProcessor {
    source: PdfSource,
}

#[derive(Debug, Clone)]
enum PdfSource {
    Path(PathBuf),
    Bytes { label: String, bytes: Vec<u8> },
}

impl PdfProcessor {
    /// Build a processor from a PDF file path.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: PdfSource::Path(path.into()),
        }
    }

    /// Build a processor from PDF bytes, labelled `memory`.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::from_labeled_bytes("memory", bytes)
    }

    /// Build a processor from PDF bytes that came from a known location, such as a URL.
    #[must_use]
    pub fn from_labeled_bytes(label: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            source: PdfSource::Bytes {
                label: label.into(),
                bytes: bytes.into(),
            },
        }
    }

    /// Extracts normalized page text and metadata.
    ///
    /// # Errors
    /// Returns [`PdfProcessError::Parse`] for malformed input, [`PdfProcessError::Io`] when
    /// the file cannot be read, and [`PdfProcessError::NoText`] when no page has text
    /// (typically scanned documents).
    pub fn extract(&self, options: &PdfProcessOptions) -> Result<ProcessedDocument> {
        let processed = match &self.source {
            PdfSource::Path(path) => {
                if !path.exists() {
                    return Err(PdfProcessError::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("{} does not exist", path.display()),
                    )));
                }
                parser::parse_from_path(path, options)?
            }
            PdfSource::Bytes { label, bytes } => parser::parse_from_bytes(bytes, label, options)?,
        };

        if processed.is_blank() {
            return Err(PdfProcessError::NoText {
                label: processed.source,
            });
        }

        tracing::debug!(
            source = %processed.source,
            pages = processed.page_count,
            "extracted PDF text"
        );
        Ok(processed)
    }

    /// Returns source path if available.
    #[must_use]
    pub fn source_path(&self) -> Option<&Path> {
        match &self.source {
            PdfSource::Path(path) => Some(path.as_path()),
            PdfSource::Bytes { .. } => None,
        }
    }
}
