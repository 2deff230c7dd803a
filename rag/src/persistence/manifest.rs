use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::index::IndexKind;

use super::MANIFEST_FILE;

/// Version of the on-disk layout written by this crate.
pub const FORMAT_VERSION: u32 = 1;

/// Describes how a saved store was built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Layout version, see [`FORMAT_VERSION`].
    pub format_version: u32,
    /// Identifier of the embedding model that produced the vectors. May be empty.
    pub embedding_model: String,
    /// Embedding dimensionality.
    pub dimension: usize,
    /// Concrete index structure (never `auto`).
    pub index_kind: IndexKind,
    /// Number of stored chunks.
    pub chunk_count: usize,
}

impl Manifest {
    /// Creates a manifest for the current layout version.
    #[must_use]
    pub fn new(
        embedding_model: impl Into<String>,
        dimension: usize,
        index_kind: IndexKind,
        chunk_count: usize,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            embedding_model: embedding_model.into(),
            dimension,
            index_kind,
            chunk_count,
        }
    }

    /// Reads `manifest.json` from a store directory.
    ///
    /// # Errors
    /// Returns [`RagError::Persistence`] if the file is missing or unreadable and
    /// [`RagError::Serialization`] if it is not a manifest.
    pub fn read(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let bytes = fs::read(&path).map_err(|source| RagError::Persistence {
            path: path.clone(),
            source,
        })?;
        serde_json::from_slice(&bytes)
            .map_err(|e| RagError::Serialization(format!("{}: {e}", path.display())))
    }

    /// Writes `manifest.json` into a store directory.
    ///
    /// # Errors
    /// Returns [`RagError::Persistence`] if the file cannot be written.
    pub fn write(&self, dir: &Path) -> Result<()> {
        let path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| RagError::Serialization(e.to_string()))?;
        fs::write(&path, json).map_err(|source| RagError::Persistence { path, source })
    }

    /// Checks that vectors from `embedding_model` with `dimension` components can
    /// query this store. An empty model name on either side matches any model.
    ///
    /// # Errors
    /// Returns [`RagError::IncompatibleIndex`] naming the first mismatch.
    pub fn ensure_compatible(&self, embedding_model: &str, dimension: usize) -> Result<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(RagError::IncompatibleIndex {
                expected: format!("format version {FORMAT_VERSION}"),
                found: format!("format version {}", self.format_version),
            });
        }
        if self.dimension != dimension {
            return Err(RagError::IncompatibleIndex {
                expected: format!("dimension {dimension}"),
                found: format!("dimension {}", self.dimension),
            });
        }
        if !embedding_model.is_empty()
            && !self.embedding_model.is_empty()
            && self.embedding_model != embedding_model
        {
            return Err(RagError::IncompatibleIndex {
                expected: format!("embedding model {embedding_model}"),
                found: format!("embedding model {}", self.embedding_model),
            });
        }
        Ok(())
    }
}
