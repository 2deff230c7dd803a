//! Turning document locations into [`Document`]s.

use std::future::Future;

use ragbot_pdf::{PdfProcessOptions, PdfProcessor, ProcessedDocument};

use crate::error::{RagError, Result};
use crate::indexing::{IndexProgress, IndexStage};
use crate::types::{Document, Metadata, SOURCE_KEY};

/// Metadata key holding the PDF title.
pub const TITLE_KEY: &str = "title";
/// Metadata key holding the PDF author.
pub const AUTHOR_KEY: &str = "author";
/// Metadata key holding the number of pages in the PDF.
pub const PAGE_COUNT_KEY: &str = "page_count";

/// Loads one document from a URL or path.
pub trait DocumentLoader: Send + Sync {
    /// Fetches and parses the document at `location`.
    ///
    /// The returned document's id and `source` metadata are `location`.
    ///
    /// # Errors
    /// Returns [`RagError::IngestionFailure`] if the document cannot be fetched or parsed.
    fn load(&self, location: &str) -> impl Future<Output = Result<Document>> + Send;
}

impl<T: DocumentLoader> DocumentLoader for &T {
    fn load(&self, location: &str) -> impl Future<Output = Result<Document>> + Send {
        T::load(self, location)
    }
}

/// Reads PDFs from the local filesystem.
///
/// Pages are joined with blank lines into one text, so chunks may span page breaks.
#[derive(Debug, Clone, Default)]
pub struct PdfLoader {
    options: PdfProcessOptions,
}

impl PdfLoader {
    /// Creates a loader extracting every page.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a loader with custom extraction options.
    #[must_use]
    pub const fn with_options(options: PdfProcessOptions) -> Self {
        Self { options }
    }

    /// Parses PDF bytes fetched from `location`.
    ///
    /// # Errors
    /// Returns [`RagError::IngestionFailure`] if the bytes are not a PDF with text.
    pub fn load_bytes(&self, location: &str, bytes: Vec<u8>) -> Result<Document> {
        let processed = PdfProcessor::from_labeled_bytes(location, bytes)
            .extract(&self.options)
            .map_err(|e| ingestion_failure(location, e))?;
        Ok(into_document(location, &processed))
    }

    /// Parses the PDF file at `path`.
    ///
    /// # Errors
    /// Returns [`RagError::IngestionFailure`] if the file is missing or unreadable.
    pub fn load_path(&self, path: &str) -> Result<Document> {
        let processed = PdfProcessor::from_path(path)
            .extract(&self.options)
            .map_err(|e| ingestion_failure(path, e))?;
        Ok(into_document(path, &processed))
    }
}

impl DocumentLoader for PdfLoader {
    fn load(&self, location: &str) -> impl Future<Output = Result<Document>> + Send {
        let loaded = self.load_path(location);
        async move { loaded }
    }
}

/// Builds an [`RagError::IngestionFailure`] for `location`.
pub fn ingestion_failure(location: &str, reason: impl std::fmt::Display) -> RagError {
    RagError::IngestionFailure {
        location: location.to_string(),
        reason: reason.to_string(),
    }
}

fn into_document(location: &str, processed: &ProcessedDocument) -> Document {
    let mut metadata = Metadata::from([
        (SOURCE_KEY.to_string(), location.to_string()),
        (PAGE_COUNT_KEY.to_string(), processed.page_count.to_string()),
    ]);
    if let Some(title) = &processed.metadata.title {
        metadata.insert(TITLE_KEY.to_string(), title.clone());
    }
    if let Some(author) = &processed.metadata.author {
        metadata.insert(AUTHOR_KEY.to_string(), author.clone());
    }
    Document::with_metadata(location, processed.text(), metadata)
}

/// Loads the first `limit` of `locations` in order.
///
/// A location that fails to load is logged, reported as [`IndexStage::Skipped`] and
/// left out; the remaining locations are still attempted.
pub async fn load_documents<L: DocumentLoader>(
    loader: &L,
    locations: &[String],
    limit: usize,
    mut on_progress: impl FnMut(IndexProgress),
) -> Vec<Document> {
    let selected = &locations[..locations.len().min(limit)];
    let total = selected.len();
    let mut documents = Vec::with_capacity(total);

    for (processed, location) in selected.iter().enumerate() {
        on_progress(IndexProgress::new(
            processed,
            total,
            Some(location.clone()),
            IndexStage::Loading,
        ));
        match loader.load(location).await {
            Ok(document) => documents.push(document),
            Err(error) => {
                tracing::warn!(%error, location = %location, "skipping document");
                on_progress(IndexProgress::new(
                    processed + 1,
                    total,
                    Some(location.clone()),
                    IndexStage::Skipped {
                        reason: error.to_string(),
                    },
                ));
            }
        }
    }

    tracing::info!(loaded = documents.len(), requested = total, "loaded documents");
    documents
}
