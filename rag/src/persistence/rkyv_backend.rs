//! rkyv-based binary docstore.

use rkyv::rancor::Error as RkyvError;
use rkyv::util::AlignedVec;
use rkyv::{from_bytes, to_bytes};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RagError, Result};
use crate::types::{Chunk, IndexEntry, Metadata};

use super::Persistence;

#[derive(rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
struct Docstore {
    entries: Vec<StoredEntry>,
}

#[derive(rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
struct StoredEntry {
    id: String,
    text: String,
    source_id: String,
    index: u64,
    content_hash: u64,
    metadata: Vec<(String, String)>,
    embedding: Vec<f32>,
}

impl From<&IndexEntry> for StoredEntry {
    fn from(entry: &IndexEntry) -> Self {
        let chunk = &entry.chunk;
        Self {
            id: chunk.id.clone(),
            text: chunk.text.clone(),
            source_id: chunk.source_id.clone(),
            index: chunk.index as u64,
            content_hash: chunk.content_hash,
            metadata: chunk
                .metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            embedding: entry.embedding.clone(),
        }
    }
}

impl TryFrom<StoredEntry> for IndexEntry {
    type Error = RagError;

    fn try_from(stored: StoredEntry) -> Result<Self> {
        let index = usize::try_from(stored.index).map_err(|_| {
            RagError::Serialization(format!("chunk ordinal {} out of range", stored.index))
        })?;
        let metadata: Metadata = stored.metadata.into_iter().collect();
        let chunk = Chunk::with_metadata(
            stored.id,
            stored.text,
            stored.source_id,
            index,
            stored.content_hash,
            metadata,
        );
        Ok(Self::new(chunk, stored.embedding))
    }
}

/// Binary docstore using rkyv with validation on read.
///
/// Entries keep their order, so a reloaded index breaks score ties exactly like the
/// index that was saved.
///
/// # Example
///
/// ```rust,no_run
/// use ragbot_rag::persistence::{Persistence, RkyvPersistence};
///
/// let docstore = RkyvPersistence::new("./store/docstore.rkyv");
/// let entries = docstore.load().unwrap();
/// println!("{} chunks", entries.len());
/// ```
#[derive(Debug)]
pub struct RkyvPersistence {
    path: PathBuf,
}

impl RkyvPersistence {
    /// Creates a docstore backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn persistence_error(&self, source: std::io::Error) -> RagError {
        RagError::Persistence {
            path: self.path.clone(),
            source,
        }
    }
}

impl Persistence for RkyvPersistence {
    fn save(&self, entries: &[IndexEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.persistence_error(e))?;
        }

        let docstore = Docstore {
            entries: entries.iter().map(StoredEntry::from).collect(),
        };
        let bytes =
            to_bytes::<RkyvError>(&docstore).map_err(|e| RagError::Serialization(e.to_string()))?;

        fs::write(&self.path, &bytes).map_err(|e| self.persistence_error(e))
    }

    fn load(&self) -> Result<Vec<IndexEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let raw = fs::read(&self.path).map_err(|e| self.persistence_error(e))?;
        if raw.is_empty() {
            return Ok(Vec::new());
        }

        let mut bytes = AlignedVec::<16>::with_capacity(raw.len());
        bytes.extend_from_slice(&raw);
        let docstore = from_bytes::<Docstore, RkyvError>(&bytes)
            .map_err(|e| RagError::Serialization(e.to_string()))?;

        docstore
            .entries
            .into_iter()
            .map(IndexEntry::try_from)
            .collect()
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_entry(id: &str, text: &str) -> IndexEntry {
        let chunk = Chunk::new(id, text, "doc1", 3, crate::dedup::content_hash(text));
        IndexEntry::new(chunk, vec![1.0, 2.0, 3.0, 4.0])
    }

    #[test]
    fn save_and_load_preserves_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("docstore.rkyv");
        let docstore = RkyvPersistence::new(&path);

        let mut entry = make_entry("c1", "hello");
        entry
            .chunk
            .metadata
            .insert("title".into(), "Annual Report".into());
        let entries = vec![entry, make_entry("c2", "world")];

        docstore.save(&entries).unwrap();
        assert!(path.exists());
        assert_eq!(docstore.load().unwrap(), entries);
    }

    #[test]
    fn load_nonexistent() {
        let dir = tempdir().unwrap();
        let docstore = RkyvPersistence::new(dir.path().join("nonexistent.rkyv"));
        assert!(docstore.load().unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_is_serialization_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("docstore.rkyv");
        fs::write(&path, b"definitely not rkyv").unwrap();

        let result = RkyvPersistence::new(&path).load();
        assert!(matches!(result, Err(RagError::Serialization(_))));
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/store/docstore.rkyv");
        let docstore = RkyvPersistence::new(&path);

        docstore.save(&[]).unwrap();
        assert!(docstore.load().unwrap().is_empty());
    }
}
