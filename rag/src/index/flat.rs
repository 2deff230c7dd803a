//! Exact brute-force vector index.

use parking_lot::RwLock;
use rayon::prelude::*;

use crate::error::Result;
use crate::types::{Chunk, IndexEntry, SearchResult};

use super::{EntryTable, IndexKind, VectorIndex, cosine_similarity};

/// Exact cosine similarity index.
///
/// Every query scores all entries in parallel with rayon. For the corpus sizes of a
/// typical knowledge base this beats building a graph, and results are exact.
#[derive(Debug)]
pub struct FlatIndex {
    dimension: usize,
    table: RwLock<EntryTable>,
}

impl FlatIndex {
    /// Creates an empty index for vectors of `dimension` components.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            table: RwLock::new(EntryTable::default()),
        }
    }
}

impl VectorIndex for FlatIndex {
    fn insert(&self, chunk: Chunk, embedding: Vec<f32>) -> Result<()> {
        EntryTable::check_dimension(self.dimension, &embedding)?;
        self.table.write().upsert(IndexEntry::new(chunk, embedding));
        Ok(())
    }

    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        EntryTable::check_dimension(self.dimension, query)?;
        let table = self.table.read();
        if table.entries.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let scored: Vec<(usize, f32)> = table
            .entries
            .par_iter()
            .enumerate()
            .map(|(idx, entry)| (idx, cosine_similarity(query, &entry.embedding)))
            .collect();

        Ok(table.rank(scored, top_k))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn kind(&self) -> IndexKind {
        IndexKind::Flat
    }

    fn len(&self) -> usize {
        self.table.read().entries.len()
    }

    fn entries(&self) -> Vec<IndexEntry> {
        self.table.read().entries.clone()
    }

    fn load(&self, entries: Vec<IndexEntry>) -> Result<()> {
        for entry in &entries {
            EntryTable::check_dimension(self.dimension, &entry.embedding)?;
        }
        self.table.write().replace(entries);
        Ok(())
    }
}
