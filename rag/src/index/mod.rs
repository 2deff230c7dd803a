//! Vector index implementations.
//!
//! This module provides the [`VectorIndex`] trait with two implementations:
//! [`FlatIndex`] scans every entry in parallel and is exact, [`HnswIndex`] builds an
//! approximate nearest neighbor graph for large corpora. [`IndexKind::Auto`] picks
//! between them by corpus size.

mod flat;
mod hnsw;

pub use flat::FlatIndex;
pub use hnsw::HnswIndex;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::types::{Chunk, IndexEntry, SearchResult};

/// Corpus size from which [`IndexKind::Auto`] switches to HNSW.
pub const HNSW_THRESHOLD: usize = 10_000;

/// Nearest-neighbor structure backing a vector store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Exact below [`HNSW_THRESHOLD`] chunks, HNSW above.
    #[default]
    Auto,
    /// Exact brute-force cosine scan.
    Flat,
    /// Approximate HNSW graph.
    Hnsw,
}

impl IndexKind {
    /// Resolves `Auto` for a corpus of `len` chunks.
    #[must_use]
    pub const fn resolve(self, len: usize) -> Self {
        match self {
            Self::Auto if len < HNSW_THRESHOLD => Self::Flat,
            Self::Auto => Self::Hnsw,
            other => other,
        }
    }

    /// Creates an empty index of this kind.
    #[must_use]
    pub fn create(self, dimension: usize, len: usize) -> Arc<dyn VectorIndex> {
        match self.resolve(len) {
            Self::Hnsw => Arc::new(HnswIndex::new(dimension)),
            Self::Auto | Self::Flat => Arc::new(FlatIndex::new(dimension)),
        }
    }

    /// Stable lowercase name used in manifests and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Flat => "flat",
            Self::Hnsw => "hnsw",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for vector index implementations.
///
/// A vector index stores chunks with their embedding vectors and answers cosine
/// similarity queries. Results are ordered by descending score; equal scores keep
/// insertion order so repeated queries are deterministic.
pub trait VectorIndex: Send + Sync + fmt::Debug {
    /// Inserts or updates a chunk with its embedding vector.
    ///
    /// If a chunk with the same ID already exists, it will be replaced.
    ///
    /// # Errors
    /// Returns [`RagError::DimensionMismatch`] for a vector of the wrong length.
    fn insert(&self, chunk: Chunk, embedding: Vec<f32>) -> Result<()>;

    /// Returns up to `top_k` chunks most similar to `query`.
    ///
    /// # Errors
    /// Returns [`RagError::DimensionMismatch`] for a query of the wrong length.
    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>>;

    /// Returns the embedding dimension.
    fn dimension(&self) -> usize;

    /// Returns the concrete structure of this index.
    fn kind(&self) -> IndexKind;

    /// Returns the number of indexed chunks.
    fn len(&self) -> usize;

    /// Returns `true` if the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns all entries in insertion order.
    fn entries(&self) -> Vec<IndexEntry>;

    /// Loads entries into the index, replacing existing content.
    ///
    /// # Errors
    /// Returns [`RagError::DimensionMismatch`] if any entry has the wrong length.
    fn load(&self, entries: Vec<IndexEntry>) -> Result<()>;

    /// Writes any auxiliary search structure to `path`.
    ///
    /// Returns `false` when the index has nothing beyond its entries to persist.
    ///
    /// # Errors
    /// Returns a persistence or serialization error if writing fails.
    fn save_graph(&self, _path: &Path) -> Result<bool> {
        Ok(false)
    }

    /// Restores an auxiliary search structure written by [`VectorIndex::save_graph`].
    ///
    /// Must be called after [`VectorIndex::load`].
    ///
    /// # Errors
    /// Returns a persistence or serialization error if reading fails.
    fn load_graph(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

/// Computes cosine similarity between two vectors; zero vectors score 0.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (lhs, rhs) in a.iter().zip(b) {
        dot += lhs * rhs;
        norm_a += lhs * lhs;
        norm_b += rhs * rhs;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Entry storage shared by the index implementations.
#[derive(Debug, Default)]
struct EntryTable {
    entries: Vec<IndexEntry>,
    id_to_index: HashMap<String, usize>,
}

impl EntryTable {
    fn check_dimension(expected: usize, embedding: &[f32]) -> Result<()> {
        if embedding.len() == expected {
            Ok(())
        } else {
            Err(RagError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            })
        }
    }

    fn upsert(&mut self, entry: IndexEntry) {
        if let Some(&idx) = self.id_to_index.get(&entry.chunk.id) {
            self.entries[idx] = entry;
            self.reindex();
        } else {
            let idx = self.entries.len();
            self.id_to_index.insert(entry.chunk.id.clone(), idx);
            self.entries.push(entry);
        }
    }

    fn replace(&mut self, entries: Vec<IndexEntry>) {
        self.entries = entries;
        self.reindex();
    }

    fn reindex(&mut self) {
        self.id_to_index.clear();
        for (idx, entry) in self.entries.iter().enumerate() {
            self.id_to_index.insert(entry.chunk.id.clone(), idx);
        }
    }

    /// Turns `(entry index, similarity)` pairs into ordered results.
    fn rank(&self, mut scored: Vec<(usize, f32)>, top_k: usize) -> Vec<SearchResult> {
        scored.sort_by(|(ia, sa), (ib, sb)| sb.total_cmp(sa).then(ia.cmp(ib)));
        scored
            .into_iter()
            .take(top_k)
            .map(|(idx, score)| SearchResult::new(self.entries[idx].chunk.clone(), score))
            .collect()
    }
}
