//! Error types for the RAG crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// A caller supplied an unusable argument (`k == 0`, empty question, bad config).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A persisted index was built under a different embedding model or format.
    #[error("incompatible index: expected {expected}, found {found}")]
    IncompatibleIndex {
        /// What the current embedder or reader requires.
        expected: String,
        /// What the persisted index declares.
        found: String,
    },

    /// One document could not be loaded or parsed.
    #[error("failed to ingest {location}: {reason}")]
    IngestionFailure {
        /// URL or path of the document.
        location: String,
        /// Human readable cause.
        reason: String,
    },

    /// Every retrieval path or the answer composer failed.
    #[error("service unavailable: {0}")]
    ExternalServiceUnavailable(String),

    /// Embedding operation failed.
    #[error("embedding failed: {0}")]
    Embedding(#[source] anyhow::Error),

    /// Dimension mismatch between embedding and index.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension provided.
        actual: usize,
    },

    /// An index build was cancelled through its abort signal.
    #[error("index build aborted")]
    Aborted,

    /// Persistence operation failed.
    #[error("persistence error at {path}: {source}")]
    Persistence {
        /// Path where the error occurred.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl RagError {
    /// Returns `true` for failures a user can reasonably retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ExternalServiceUnavailable(_) | Self::Embedding(_))
    }

    /// Text suitable for showing to the person asking the question.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidArgument(reason) => format!("Invalid request: {reason}"),
            Self::ExternalServiceUnavailable(_) | Self::Embedding(_) => {
                "The assistant is temporarily unavailable, please try again.".to_string()
            }
            other => format!("Something went wrong: {other}"),
        }
    }
}

/// Result type alias for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_failures_ask_to_retry() {
        let err = RagError::ExternalServiceUnavailable("composer timed out".into());
        assert!(err.is_retryable());
        assert!(err.user_message().contains("try again"));
    }

    #[test]
    fn argument_errors_are_not_retryable() {
        let err = RagError::InvalidArgument("k must be positive".into());
        assert!(!err.is_retryable());
        assert_eq!(err.user_message(), "Invalid request: k must be positive");
    }

    #[test]
    fn incompatible_index_names_both_sides() {
        let err = RagError::IncompatibleIndex {
            expected: "dimension 768".into(),
            found: "dimension 384".into(),
        };
        assert_eq!(
            err.to_string(),
            "incompatible index: expected dimension 768, found dimension 384"
        );
    }
}
