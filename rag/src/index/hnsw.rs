//! HNSW-based vector index using instant-distance.

use std::fs;
use std::path::Path;

use instant_distance::{Builder, HnswMap, Point, Search};
use parking_lot::{RwLock, RwLockReadGuard, RwLockUpgradableReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::types::{Chunk, IndexEntry, SearchResult};

use super::{EntryTable, IndexKind, VectorIndex, cosine_similarity};

/// Seed for graph construction, so the same entries always produce the same graph.
const GRAPH_SEED: u64 = 0x5241_4742;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct EmbeddingPoint {
    embedding: Vec<f32>,
}

impl Point for EmbeddingPoint {
    fn distance(&self, other: &Self) -> f32 {
        1.0 - cosine_similarity(&self.embedding, &other.embedding)
    }
}

type Graph = HnswMap<EmbeddingPoint, usize>;

#[derive(Default)]
struct IndexState {
    table: EntryTable,
    /// Built lazily on the first search after a modification.
    graph: Option<Graph>,
}

impl IndexState {
    fn rebuild(&mut self) {
        let points = self
            .table
            .entries
            .iter()
            .map(|e| EmbeddingPoint {
                embedding: e.embedding.clone(),
            })
            .collect();
        let values = (0..self.table.entries.len()).collect();
        self.graph = Some(Builder::default().seed(GRAPH_SEED).build(points, values));
        tracing::debug!(entries = self.table.entries.len(), "rebuilt HNSW graph");
    }
}

/// HNSW vector index for approximate nearest neighbor search.
///
/// The graph is rebuilt on the first search after any modification and can be
/// persisted next to the entries with [`VectorIndex::save_graph`], so a loaded index
/// answers queries without rebuilding.
///
/// # Example
///
/// ```rust
/// use ragbot_rag::index::{HnswIndex, VectorIndex};
/// use ragbot_rag::Chunk;
///
/// let index = HnswIndex::new(2);
/// index.insert(Chunk::new("c1", "hello", "doc", 0, 1), vec![1.0, 0.0]).unwrap();
/// let results = index.search(&[1.0, 0.0], 5).unwrap();
/// assert_eq!(results[0].chunk.id, "c1");
/// ```
pub struct HnswIndex {
    dimension: usize,
    state: RwLock<IndexState>,
}

impl std::fmt::Debug for HnswIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("HnswIndex")
            .field("dimension", &self.dimension)
            .field("len", &state.table.entries.len())
            .field("graph_built", &state.graph.is_some())
            .finish()
    }
}

impl HnswIndex {
    /// Creates a new HNSW index with the specified embedding dimension.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            state: RwLock::new(IndexState::default()),
        }
    }

    /// Read access with the graph built, or `None` when there are no entries.
    fn built(&self) -> Option<RwLockReadGuard<'_, IndexState>> {
        let state = self.state.upgradable_read();
        if state.table.entries.is_empty() {
            return None;
        }
        Some(if state.graph.is_none() {
            let mut state = RwLockUpgradableReadGuard::upgrade(state);
            state.rebuild();
            RwLockWriteGuard::downgrade(state)
        } else {
            RwLockUpgradableReadGuard::downgrade(state)
        })
    }

    fn modify<T>(&self, f: impl FnOnce(&mut EntryTable) -> T) -> T {
        let mut state = self.state.write();
        state.graph = None;
        f(&mut state.table)
    }
}

impl VectorIndex for HnswIndex {
    fn insert(&self, chunk: Chunk, embedding: Vec<f32>) -> Result<()> {
        EntryTable::check_dimension(self.dimension, &embedding)?;
        self.modify(|table| table.upsert(IndexEntry::new(chunk, embedding)));
        Ok(())
    }

    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        EntryTable::check_dimension(self.dimension, query)?;

        if top_k == 0 {
            return Ok(Vec::new());
        }
        let Some(state) = self.built() else {
            return Ok(Vec::new());
        };
        let Some(graph) = state.graph.as_ref() else {
            return Ok(Vec::new());
        };

        let point = EmbeddingPoint {
            embedding: query.to_vec(),
        };
        let mut search = Search::default();
        let scored = graph
            .search(&point, &mut search)
            .take(top_k)
            .map(|candidate| (*candidate.value, 1.0 - candidate.distance))
            .collect();

        Ok(state.table.rank(scored, top_k))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn kind(&self) -> IndexKind {
        IndexKind::Hnsw
    }

    fn len(&self) -> usize {
        self.state.read().table.entries.len()
    }

    fn entries(&self) -> Vec<IndexEntry> {
        self.state.read().table.entries.clone()
    }

    fn load(&self, entries: Vec<IndexEntry>) -> Result<()> {
        for entry in &entries {
            EntryTable::check_dimension(self.dimension, &entry.embedding)?;
        }
        self.modify(|table| table.replace(entries));
        Ok(())
    }

    fn save_graph(&self, path: &Path) -> Result<bool> {
        let Some(state) = self.built() else {
            return Ok(false);
        };

        let json = serde_json::to_vec(&state.graph)
            .map_err(|e| RagError::Serialization(e.to_string()))?;
        fs::write(path, json).map_err(|source| RagError::Persistence {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(true)
    }

    fn load_graph(&self, path: &Path) -> Result<()> {
        let bytes = fs::read(path).map_err(|source| RagError::Persistence {
            path: path.to_path_buf(),
            source,
        })?;
        let graph: Option<Graph> =
            serde_json::from_slice(&bytes).map_err(|e| RagError::Serialization(e.to_string()))?;

        let mut state = self.state.write();
        let len = state.table.entries.len();
        if let Some(graph) = &graph
            && (graph.values.len() != len || graph.values.iter().any(|&idx| idx >= len))
        {
            return Err(RagError::Serialization(format!(
                "HNSW graph at {} does not match {len} stored entries",
                path.display()
            )));
        }
        state.graph = graph;
        Ok(())
    }
}
