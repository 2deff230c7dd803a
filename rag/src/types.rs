//! Core types for the RAG crate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key/value metadata attached to documents and chunks.
pub type Metadata = BTreeMap<String, String>;

/// Metadata key naming where a document came from (URL or path).
pub const SOURCE_KEY: &str = "source";

/// A loaded source document.
///
/// Documents are immutable once loaded; chunking derives new values from them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier for the document.
    pub id: String,
    /// Raw text content.
    pub text: String,
    /// Arbitrary metadata for citations. Always carries [`SOURCE_KEY`] when built by a loader.
    pub metadata: Metadata,
}

impl Document {
    /// Creates a document whose `source` metadata equals its id.
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        let id = id.into();
        let metadata = Metadata::from([(SOURCE_KEY.to_string(), id.clone())]);
        Self {
            id,
            text: text.into(),
            metadata,
        }
    }

    /// Creates a document with explicit metadata.
    #[must_use]
    pub fn with_metadata(
        id: impl Into<String>,
        text: impl Into<String>,
        metadata: Metadata,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata,
        }
    }

    /// Returns the `source` metadata value, if any.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).map(String::as_str)
    }
}

/// A chunk of text derived from exactly one document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier for this chunk (format: `{doc_id}#chunk_{n}`).
    pub id: String,
    /// Text content of the chunk.
    pub text: String,
    /// Parent document ID.
    pub source_id: String,
    /// Ordinal of this chunk within the document.
    pub index: usize,
    /// Metadata inherited from the parent document.
    pub metadata: Metadata,
    /// Content hash for deduplication.
    pub content_hash: u64,
}

impl Chunk {
    /// Creates a new chunk with empty metadata.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        source_id: impl Into<String>,
        index: usize,
        content_hash: u64,
    ) -> Self {
        Self::with_metadata(id, text, source_id, index, content_hash, Metadata::new())
    }

    /// Creates a new chunk with metadata.
    #[must_use]
    pub fn with_metadata(
        id: impl Into<String>,
        text: impl Into<String>,
        source_id: impl Into<String>,
        index: usize,
        content_hash: u64,
        metadata: Metadata,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source_id: source_id.into(),
            index,
            metadata,
            content_hash,
        }
    }

    /// Builds the canonical chunk id for a document ordinal.
    #[must_use]
    pub fn id_for(doc_id: &str, index: usize) -> String {
        format!("{doc_id}#chunk_{index}")
    }

    /// Returns the `source` of the parent document, falling back to its id.
    #[must_use]
    pub fn source(&self) -> &str {
        self.metadata
            .get(SOURCE_KEY)
            .map_or(self.source_id.as_str(), String::as_str)
    }
}

/// A retrieved chunk and its score (higher is better).
///
/// Scores are only comparable within one result list: cosine similarity for the vector
/// index, BM25 for the keyword index, fused reciprocal rank for hybrid retrieval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The matching chunk.
    pub chunk: Chunk,
    /// Relevance score.
    pub score: f32,
}

impl SearchResult {
    /// Creates a new result.
    #[must_use]
    pub const fn new(chunk: Chunk, score: f32) -> Self {
        Self { chunk, score }
    }
}

/// Entry stored in the vector index docstore.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// The chunk.
    pub chunk: Chunk,
    /// The embedding vector.
    pub embedding: Vec<f32>,
}

impl IndexEntry {
    /// Creates a new index entry.
    #[must_use]
    pub const fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self { chunk, embedding }
    }
}
