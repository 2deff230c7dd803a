//! On-disk layout of a saved vector store.
//!
//! A store directory holds three files:
//!
//! - `manifest.json`: format version, embedding model, dimension, index kind and
//!   chunk count, checked before anything else is read
//! - `docstore.rkyv`: every chunk with its embedding, see [`RkyvPersistence`]
//! - `hnsw.json`: the HNSW graph, present only for HNSW indices

mod manifest;
mod rkyv_backend;

pub use manifest::{FORMAT_VERSION, Manifest};
pub use rkyv_backend::RkyvPersistence;

use crate::error::Result;
use crate::types::IndexEntry;
use std::path::Path;

/// Manifest file name inside a store directory.
pub const MANIFEST_FILE: &str = "manifest.json";
/// Docstore file name inside a store directory.
pub const DOCSTORE_FILE: &str = "docstore.rkyv";
/// HNSW graph file name inside a store directory.
pub const GRAPH_FILE: &str = "hnsw.json";

/// Trait for entry persistence backends.
pub trait Persistence: Send + Sync {
    /// Saves all index entries to storage.
    ///
    /// # Errors
    /// Returns a persistence or serialization error if writing fails.
    fn save(&self, entries: &[IndexEntry]) -> Result<()>;

    /// Loads all index entries from storage, in the order they were saved.
    ///
    /// Returns an empty vector if no data exists.
    ///
    /// # Errors
    /// Returns a persistence or serialization error if the data cannot be read.
    fn load(&self) -> Result<Vec<IndexEntry>>;

    /// Returns the storage path.
    fn path(&self) -> &Path;
}
