//! Loading PDFs from URLs as well as local paths.

use std::time::Duration;

use ragbot_rag::{Document, DocumentLoader, PdfLoader, Result, ingestion_failure};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Returns `true` if `location` should be downloaded rather than read from disk.
#[must_use]
pub fn is_remote(location: &str) -> bool {
    let lower = location.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Document loader that downloads `http(s)` locations and reads anything else as a
/// local path.
#[derive(Debug, Clone)]
pub struct RemotePdfLoader {
    http: reqwest::Client,
    pdf: PdfLoader,
}

impl RemotePdfLoader {
    /// Creates a loader with a dedicated HTTP client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be initialised.
    pub fn new() -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .user_agent(concat!("ragbot/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            pdf: PdfLoader::new(),
        })
    }

    async fn download(&self, url: &str) -> reqwest::Result<Vec<u8>> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

impl DocumentLoader for RemotePdfLoader {
    async fn load(&self, location: &str) -> Result<Document> {
        if !is_remote(location) {
            return self.pdf.load_path(location);
        }
        tracing::debug!(url = %location, "downloading");
        let bytes = self
            .download(location)
            .await
            .map_err(|e| ingestion_failure(location, e))?;
        self.pdf.load_bytes(location, bytes)
    }
}
