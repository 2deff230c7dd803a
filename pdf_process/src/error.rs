use thiserror::Error;

/// Errors emitted by the PDF extraction pipeline.
#[derive(Debug, Error)]
pub enum PdfProcessError {
    /// The input bytes do not decode as a valid PDF structure.
    #[error("failed to parse PDF: {0}")]
    Parse(String),
    /// The source PDF could not be read from the filesystem.
    #[error("failed to read PDF: {0}")]
    Io(#[from] std::io::Error),
    /// Every selected page came back without extractable text.
    #[error("PDF {label} contains no extractable text")]
    NoText {
        /// Path or label of the offending document.
        label: String,
    },
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, PdfProcessError>;
