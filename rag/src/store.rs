//! Embedding-backed vector store with directory persistence.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ragbot_core::EmbeddingModel;

use crate::error::{RagError, Result};
use crate::index::{IndexKind, VectorIndex};
use crate::persistence::{DOCSTORE_FILE, GRAPH_FILE, Manifest, Persistence, RkyvPersistence};
use crate::types::{Chunk, IndexEntry, SearchResult};

/// Number of chunks sent to the embedder per request.
pub const EMBED_BATCH_SIZE: usize = 32;

/// Semantic search over embedded chunks.
///
/// A `VectorStore` pairs an embedding model with a [`VectorIndex`]. The same embedder
/// vectorizes chunks at build time and queries at search time, so build and query
/// always share one metric. Cloning is cheap and shares the index.
pub struct VectorStore<M: EmbeddingModel> {
    embedder: Arc<M>,
    index: Arc<dyn VectorIndex>,
}

impl<M: EmbeddingModel> Clone for VectorStore<M> {
    fn clone(&self) -> Self {
        Self {
            embedder: Arc::clone(&self.embedder),
            index: Arc::clone(&self.index),
        }
    }
}

impl<M: EmbeddingModel> fmt::Debug for VectorStore<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorStore")
            .field("embedding_model", &self.embedder.name())
            .field("index", &self.index)
            .finish()
    }
}

impl<M: EmbeddingModel> VectorStore<M> {
    /// Creates an empty store. `Auto` resolves as for an empty corpus.
    #[must_use]
    pub fn new(embedder: Arc<M>, kind: IndexKind) -> Self {
        let index = kind.create(embedder.dim(), 0);
        Self { embedder, index }
    }

    /// Embeds `chunks` and indexes them.
    ///
    /// # Errors
    /// Returns [`RagError::Embedding`] if the embedder fails and
    /// [`RagError::DimensionMismatch`] if it returns vectors of the wrong size.
    pub async fn build(embedder: Arc<M>, chunks: Vec<Chunk>, kind: IndexKind) -> Result<Self> {
        let entries = embed_chunks(embedder.as_ref(), chunks, |_, _| Ok(())).await?;
        Self::from_entries(embedder, entries, kind)
    }

    /// Indexes chunks whose embeddings were computed elsewhere.
    ///
    /// # Errors
    /// Returns [`RagError::DimensionMismatch`] if an embedding does not match the
    /// embedder's dimension.
    pub fn from_entries(embedder: Arc<M>, entries: Vec<IndexEntry>, kind: IndexKind) -> Result<Self> {
        let index = kind.create(embedder.dim(), entries.len());
        index.load(entries)?;
        tracing::debug!(kind = %index.kind(), chunks = index.len(), "built vector index");
        Ok(Self { embedder, index })
    }

    /// Returns the `k` chunks closest to `text` by cosine similarity.
    ///
    /// An empty store returns an empty list without calling the embedder.
    ///
    /// # Errors
    /// Returns [`RagError::InvalidArgument`] if `k == 0` and [`RagError::Embedding`] if
    /// the query cannot be embedded.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(RagError::InvalidArgument("k must be positive".into()));
        }
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self
            .embedder
            .embed(text)
            .await
            .map_err(RagError::Embedding)?;
        self.index.search(&embedding, k)
    }

    /// Writes the store into `dir`, replacing any previous store there.
    ///
    /// Files are written to a sibling staging directory first and swapped in with a
    /// rename, so a crash never leaves a half-written store at `dir`.
    ///
    /// # Errors
    /// Returns [`RagError::InvalidArgument`] if `dir` has no final component, and a
    /// persistence or serialization error if any file cannot be written.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let name = dir
            .file_name()
            .ok_or_else(|| {
                RagError::InvalidArgument(format!("{} is not a directory name", dir.display()))
            })?
            .to_string_lossy()
            .into_owned();
        let staging = dir.with_file_name(format!(".{name}.staging"));
        let backup = dir.with_file_name(format!(".{name}.old"));

        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(at(&staging))?;
        }
        fs::create_dir_all(&staging).map_err(at(&staging))?;

        let entries = self.index.entries();
        RkyvPersistence::new(staging.join(DOCSTORE_FILE)).save(&entries)?;
        self.index.save_graph(&staging.join(GRAPH_FILE))?;
        Manifest::new(
            self.embedder.name(),
            self.embedder.dim(),
            self.index.kind(),
            entries.len(),
        )
        .write(&staging)?;

        if dir.exists() {
            if backup.exists() {
                fs::remove_dir_all(&backup).map_err(at(&backup))?;
            }
            fs::rename(dir, &backup).map_err(at(dir))?;
            fs::rename(&staging, dir).map_err(at(dir))?;
            fs::remove_dir_all(&backup).map_err(at(&backup))?;
        } else {
            fs::rename(&staging, dir).map_err(at(dir))?;
        }

        tracing::info!(path = %dir.display(), chunks = entries.len(), "saved vector store");
        Ok(())
    }

    /// Loads a store written by [`VectorStore::save`].
    ///
    /// # Errors
    /// Returns [`RagError::IncompatibleIndex`] if the store was built with a different
    /// embedding dimension, embedding model or layout version, and a persistence or
    /// serialization error if its files are missing or corrupt.
    pub fn load(dir: &Path, embedder: Arc<M>) -> Result<Self> {
        let manifest = Manifest::read(dir)?;
        manifest.ensure_compatible(embedder.name(), embedder.dim())?;

        let entries = RkyvPersistence::new(dir.join(DOCSTORE_FILE)).load()?;
        if entries.len() != manifest.chunk_count {
            return Err(RagError::Serialization(format!(
                "docstore holds {} chunks, manifest declares {}",
                entries.len(),
                manifest.chunk_count
            )));
        }

        let index = manifest.index_kind.create(manifest.dimension, entries.len());
        index.load(entries)?;
        let graph = dir.join(GRAPH_FILE);
        if graph.exists() {
            index.load_graph(&graph)?;
        }

        tracing::info!(
            path = %dir.display(),
            chunks = index.len(),
            kind = %index.kind(),
            "loaded vector store"
        );
        Ok(Self { embedder, index })
    }

    /// Returns all indexed chunks in insertion order.
    #[must_use]
    pub fn chunks(&self) -> Vec<Chunk> {
        self.index.entries().into_iter().map(|e| e.chunk).collect()
    }

    /// Returns the number of indexed chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if the store holds no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns the underlying index.
    #[must_use]
    pub fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }

    /// Returns the embedder.
    #[must_use]
    pub fn embedder(&self) -> &M {
        &self.embedder
    }
}

/// Embeds chunks in batches of [`EMBED_BATCH_SIZE`].
///
/// `before_batch(done, total)` runs ahead of every request and may stop the loop by
/// returning an error.
pub(crate) async fn embed_chunks<M: EmbeddingModel>(
    embedder: &M,
    chunks: Vec<Chunk>,
    mut before_batch: impl FnMut(usize, usize) -> Result<()>,
) -> Result<Vec<IndexEntry>> {
    let total = chunks.len();
    let dimension = embedder.dim();
    let mut entries = Vec::with_capacity(total);

    for batch in chunks.chunks(EMBED_BATCH_SIZE) {
        before_batch(entries.len(), total)?;
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let embeddings = embedder
            .embed_batch(&texts)
            .await
            .map_err(RagError::Embedding)?;
        if embeddings.len() != batch.len() {
            return Err(RagError::Embedding(anyhow::anyhow!(
                "embedder returned {} vectors for {} texts",
                embeddings.len(),
                batch.len()
            )));
        }
        for (chunk, embedding) in batch.iter().zip(embeddings) {
            if embedding.len() != dimension {
                return Err(RagError::DimensionMismatch {
                    expected: dimension,
                    actual: embedding.len(),
                });
            }
            entries.push(IndexEntry::new(chunk.clone(), embedding));
        }
    }

    Ok(entries)
}

fn at(path: &Path) -> impl FnOnce(std::io::Error) -> RagError {
    let path: PathBuf = path.to_path_buf();
    move |source| RagError::Persistence { path, source }
}
