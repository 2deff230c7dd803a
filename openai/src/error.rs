use std::time::Duration;

use thiserror::Error;

/// Errors that can arise when configuring or calling an OpenAI-compatible API.
#[derive(Debug, Error)]
pub enum OpenAIError {
    /// A required environment variable is not set.
    #[error("missing credentials: set {var}")]
    MissingCredentials {
        /// Name of the variable.
        var: &'static str,
    },
    /// A configuration value could not be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Transport errors: connection, TLS, timeout, body decoding.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The API answered 429.
    #[error("rate limited: {message}")]
    RateLimit {
        /// Message returned by the API.
        message: String,
        /// Delay requested through the `Retry-After` header.
        retry_after: Option<Duration>,
    },
    /// The API answered with any other non-success status.
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message returned by the API.
        message: String,
    },
    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// The API answered successfully but without the expected content.
    #[error("empty response: {0}")]
    EmptyResponse(String),
}

impl OpenAIError {
    /// Returns `true` for failures worth retrying: transport errors, rate limits and
    /// server-side errors.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(err) => !err.is_builder() && !err.is_decode(),
            Self::RateLimit { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            Self::MissingCredentials { .. }
            | Self::InvalidConfig(_)
            | Self::Json(_)
            | Self::EmptyResponse(_) => false,
        }
    }
}
