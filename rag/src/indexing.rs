//! Corpus building with progress tracking, and atomic publication of built corpora.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use ragbot_core::EmbeddingModel;

use crate::chunking::{Chunker, RecursiveChunker};
use crate::cleaning::{BasicCleaner, Cleaner};
use crate::config::RagConfig;
use crate::dedup::dedup_chunks;
use crate::error::{RagError, Result};
use crate::hybrid::HybridRetriever;
use crate::keyword::KeywordIndex;
use crate::retriever::Retriever;
use crate::store::{VectorStore, embed_chunks};
use crate::types::{Document, SearchResult};

/// Progress update during a corpus build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexProgress {
    /// Items finished in the current stage.
    pub processed: usize,
    /// Items in the current stage.
    pub total: usize,
    /// Document being processed, if the stage works per document.
    pub current: Option<String>,
    /// Current stage of the build.
    pub stage: IndexStage,
}

impl IndexProgress {
    /// Creates a new progress update.
    #[must_use]
    pub const fn new(
        processed: usize,
        total: usize,
        current: Option<String>,
        stage: IndexStage,
    ) -> Self {
        Self {
            processed,
            total,
            current,
            stage,
        }
    }

    const fn at_stage(stage: IndexStage, processed: usize, total: usize) -> Self {
        Self::new(processed, total, None, stage)
    }
}

/// Stages of a corpus build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexStage {
    /// Fetching and parsing a document.
    Loading,
    /// Cleaning and splitting a document.
    Chunking,
    /// Embedding a batch of chunks.
    Embedding,
    /// Building the vector and keyword indices.
    Indexing,
    /// Writing the store to disk.
    Saving,
    /// The build completed.
    Done,
    /// A document was left out.
    Skipped {
        /// Why the document was skipped.
        reason: String,
    },
}

/// Cancels an in-flight build.
///
/// Clones share the flag. The build checks it between stages and before every
/// embedding batch, then stops with [`RagError::Aborted`] without writing anything.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    /// Creates a signal that has not fired.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn abort(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` once [`AbortSignal::abort`] was called.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn check(&self) -> Result<()> {
        if self.is_aborted() {
            Err(RagError::Aborted)
        } else {
            Ok(())
        }
    }
}

/// Vector and keyword indices over one chunk set.
pub struct Corpus<M: EmbeddingModel> {
    vector: VectorStore<M>,
    keyword: KeywordIndex,
}

impl<M: EmbeddingModel> fmt::Debug for Corpus<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Corpus")
            .field("vector", &self.vector)
            .field("keyword", &self.keyword)
            .finish()
    }
}

impl<M: EmbeddingModel> Clone for Corpus<M> {
    fn clone(&self) -> Self {
        Self {
            vector: self.vector.clone(),
            keyword: self.keyword.clone(),
        }
    }
}

impl<M: EmbeddingModel> Corpus<M> {
    /// Pairs a vector store with a keyword index over the same chunks.
    #[must_use]
    pub fn new(vector: VectorStore<M>) -> Self {
        let keyword = KeywordIndex::build(vector.chunks());
        Self { vector, keyword }
    }

    /// Returns the vector store.
    pub const fn vector(&self) -> &VectorStore<M> {
        &self.vector
    }

    /// Returns the keyword index.
    pub const fn keyword(&self) -> &KeywordIndex {
        &self.keyword
    }

    /// Returns the number of chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vector.len()
    }

    /// Returns `true` if the corpus holds no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vector.is_empty()
    }

    /// Returns a hybrid retriever over this corpus with the fusion settings of `config`.
    #[must_use]
    pub fn retriever(&self, config: &RagConfig) -> HybridRetriever<VectorStore<M>, KeywordIndex> {
        HybridRetriever::from_config(self.vector.clone(), self.keyword.clone(), config)
    }

    /// Persists the corpus. See [`VectorStore::save`].
    ///
    /// # Errors
    /// Returns a persistence or serialization error if the store cannot be written.
    pub fn save(&self, dir: &Path) -> Result<()> {
        self.vector.save(dir)
    }

    /// Loads a saved corpus and rebuilds its keyword index.
    ///
    /// # Errors
    /// See [`VectorStore::load`].
    pub fn load(dir: &Path, embedder: Arc<M>) -> Result<Self> {
        Ok(Self::new(VectorStore::load(dir, embedder)?))
    }
}

/// Runs clean, chunk, embed and index over loaded documents.
pub struct IndexBuilder<M> {
    embedder: Arc<M>,
    config: RagConfig,
    cleaner: Box<dyn Cleaner>,
    chunker: Option<Box<dyn Chunker>>,
    abort: AbortSignal,
}

impl<M> fmt::Debug for IndexBuilder<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexBuilder")
            .field("config", &self.config)
            .field("cleaner", &self.cleaner.name())
            .field("chunker", &self.chunker.as_ref().map(|c| c.name()))
            .field("aborted", &self.abort.is_aborted())
            .finish()
    }
}

impl<M: EmbeddingModel> IndexBuilder<M> {
    /// Creates a builder using [`BasicCleaner`] and a [`RecursiveChunker`] sized by
    /// `config`.
    #[must_use]
    pub fn new(embedder: Arc<M>, config: RagConfig) -> Self {
        Self {
            embedder,
            config,
            cleaner: Box::new(BasicCleaner),
            chunker: None,
            abort: AbortSignal::new(),
        }
    }

    /// Replaces the text cleaner.
    #[must_use]
    pub fn with_cleaner(mut self, cleaner: impl Cleaner + 'static) -> Self {
        self.cleaner = Box::new(cleaner);
        self
    }

    /// Replaces the chunking strategy.
    #[must_use]
    pub fn with_chunker(mut self, chunker: impl Chunker + 'static) -> Self {
        self.chunker = Some(Box::new(chunker));
        self
    }

    /// Makes the build observe `signal`.
    #[must_use]
    pub fn with_abort(mut self, signal: AbortSignal) -> Self {
        self.abort = signal;
        self
    }

    /// Returns the configuration.
    pub const fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Builds a corpus from `documents`.
    ///
    /// Documents that fail to chunk are skipped and reported. An empty document set
    /// yields an empty corpus.
    ///
    /// # Errors
    /// Returns [`RagError::InvalidArgument`] for an unusable configuration,
    /// [`RagError::Aborted`] if the abort signal fires, and embedding errors unchanged.
    pub async fn build(
        &self,
        documents: Vec<Document>,
        mut on_progress: impl FnMut(IndexProgress),
    ) -> Result<Corpus<M>> {
        let corpus = self.build_corpus(documents, &mut on_progress).await?;
        on_progress(IndexProgress::at_stage(IndexStage::Done, corpus.len(), corpus.len()));
        Ok(corpus)
    }

    /// Builds a corpus from `documents` and saves it to `dir`.
    ///
    /// The store at `dir` is replaced only once the whole build succeeded.
    ///
    /// # Errors
    /// See [`IndexBuilder::build`] and [`Corpus::save`].
    pub async fn build_and_save(
        &self,
        documents: Vec<Document>,
        dir: &Path,
        mut on_progress: impl FnMut(IndexProgress),
    ) -> Result<Corpus<M>> {
        let corpus = self.build_corpus(documents, &mut on_progress).await?;
        self.abort.check()?;
        on_progress(IndexProgress::at_stage(IndexStage::Saving, 0, 1));
        corpus.save(dir)?;
        on_progress(IndexProgress::at_stage(IndexStage::Done, corpus.len(), corpus.len()));
        Ok(corpus)
    }

    async fn build_corpus(
        &self,
        documents: Vec<Document>,
        on_progress: &mut impl FnMut(IndexProgress),
    ) -> Result<Corpus<M>> {
        self.config.validate()?;
        let default_chunker;
        let chunker: &dyn Chunker = if let Some(chunker) = &self.chunker {
            &**chunker
        } else {
            default_chunker = RecursiveChunker::from_config(&self.config)?;
            &default_chunker
        };

        let total = documents.len();
        let mut chunks = Vec::new();
        for (processed, document) in documents.iter().enumerate() {
            self.abort.check()?;
            on_progress(IndexProgress::new(
                processed,
                total,
                Some(document.id.clone()),
                IndexStage::Chunking,
            ));
            let cleaned = self.cleaner.clean(document);
            match chunker.chunk(&cleaned) {
                Ok(mut produced) => chunks.append(&mut produced),
                Err(error) => {
                    tracing::warn!(%error, document = %document.id, "skipping document");
                    on_progress(IndexProgress::new(
                        processed + 1,
                        total,
                        Some(document.id.clone()),
                        IndexStage::Skipped {
                            reason: error.to_string(),
                        },
                    ));
                }
            }
        }
        if self.config.deduplication {
            chunks = dedup_chunks(chunks);
        }
        tracing::info!(
            documents = total,
            chunks = chunks.len(),
            chunker = chunker.name(),
            "chunked documents"
        );
        if chunks.is_empty() {
            tracing::warn!("no chunks to index, the corpus will be empty");
        }

        let entries = embed_chunks(self.embedder.as_ref(), chunks, |done, total| {
            self.abort.check()?;
            on_progress(IndexProgress::at_stage(IndexStage::Embedding, done, total));
            Ok(())
        })
        .await?;

        self.abort.check()?;
        on_progress(IndexProgress::at_stage(IndexStage::Indexing, 0, entries.len()));
        let vector =
            VectorStore::from_entries(Arc::clone(&self.embedder), entries, self.config.index_kind)?;
        let corpus = Corpus::new(vector);
        tracing::info!(
            chunks = corpus.len(),
            kind = %corpus.vector().index().kind(),
            "built corpus"
        );
        Ok(corpus)
    }
}

/// The corpus currently served to readers, replaceable while queries run.
///
/// [`SharedCorpus::publish`] swaps in a finished corpus atomically. A query takes a
/// snapshot when it starts and finishes against it, so readers never see a partial
/// build. Before anything is published every query returns no results.
pub struct SharedCorpus<M: EmbeddingModel> {
    current: Arc<RwLock<Option<Arc<Corpus<M>>>>>,
    config: RagConfig,
}

impl<M: EmbeddingModel> Clone for SharedCorpus<M> {
    fn clone(&self) -> Self {
        Self {
            current: Arc::clone(&self.current),
            config: self.config.clone(),
        }
    }
}

impl<M: EmbeddingModel> fmt::Debug for SharedCorpus<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCorpus")
            .field("chunks", &self.snapshot().map(|c| c.len()))
            .field("config", &self.config)
            .finish()
    }
}

impl<M: EmbeddingModel> SharedCorpus<M> {
    /// Creates an empty slot querying with the fusion settings of `config`.
    #[must_use]
    pub fn new(config: RagConfig) -> Self {
        Self {
            current: Arc::new(RwLock::new(None)),
            config,
        }
    }

    /// Replaces the served corpus, returning the previous one.
    pub fn publish(&self, corpus: Corpus<M>) -> Option<Arc<Corpus<M>>> {
        let chunks = corpus.len();
        let previous = self.current.write().replace(Arc::new(corpus));
        tracing::info!(chunks, "published corpus");
        previous
    }

    /// Returns the corpus currently served, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<Corpus<M>>> {
        self.current.read().clone()
    }

    /// Runs a hybrid query against the current snapshot.
    ///
    /// # Errors
    /// See [`HybridRetriever::query`].
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(RagError::InvalidArgument("k must be positive".into()));
        }
        let Some(corpus) = self.snapshot() else {
            return Ok(Vec::new());
        };
        corpus.retriever(&self.config).query(text, k).await
    }
}

impl<M: EmbeddingModel> Retriever for SharedCorpus<M> {
    fn query(
        &self,
        text: &str,
        k: usize,
    ) -> impl std::future::Future<Output = Result<Vec<SearchResult>>> + Send {
        Self::query(self, text, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexKind;

    /// Letter-frequency embedder: deterministic and cheap.
    struct Letters;

    impl EmbeddingModel for Letters {
        fn dim(&self) -> usize {
            26
        }

        fn name(&self) -> &str {
            "letters"
        }

        #[allow(clippy::cast_precision_loss)]
        async fn embed(&self, text: &str) -> ragbot_core::Result<Vec<f32>> {
            let mut vector = vec![0.0; 26];
            for c in text.to_lowercase().chars().filter(char::is_ascii_lowercase) {
                vector[(c as u8 - b'a') as usize] += 1.0;
            }
            Ok(vector)
        }
    }

    fn documents() -> Vec<Document> {
        vec![
            Document::new("solar.pdf", "Solar panels received two billion in funding."),
            Document::new("wind.pdf", "Wind turbines received one billion in funding."),
            Document::new("copy.pdf", "Solar panels received two billion in funding."),
            Document::new("empty.pdf", "   "),
        ]
    }

    fn builder() -> IndexBuilder<Letters> {
        IndexBuilder::new(Arc::new(Letters), RagConfig::default())
    }

    #[tokio::test]
    async fn builds_deduplicated_corpus() {
        let corpus = builder().build(documents(), |_| {}).await.unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.keyword().len(), 2);

        let ids: Vec<_> = corpus.vector().chunks().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, ["solar.pdf#chunk_0", "wind.pdf#chunk_0"]);
    }

    #[tokio::test]
    async fn keyword_index_covers_the_stored_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store");
        builder()
            .build_and_save(documents(), &store, |_| {})
            .await
            .unwrap();

        let corpus = Corpus::load(&store, Arc::new(Letters)).unwrap();
        let vector_ids: Vec<_> = corpus.vector().chunks().into_iter().map(|c| c.id).collect();
        let keyword_ids: Vec<_> = corpus.keyword().chunks().iter().map(|c| c.id.clone()).collect();
        assert_eq!(vector_ids, keyword_ids);

        let hits = corpus.keyword().query("turbines", 3).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.id, "wind.pdf#chunk_0");
    }

    #[tokio::test]
    async fn deduplication_can_be_disabled() {
        let config = RagConfig::builder().deduplication(false).build();
        let corpus = IndexBuilder::new(Arc::new(Letters), config)
            .build(documents(), |_| {})
            .await
            .unwrap();
        assert_eq!(corpus.len(), 3);
    }

    #[tokio::test]
    async fn reports_stages_in_order() {
        let mut stages = Vec::new();
        builder()
            .build(documents(), |p| {
                if stages.last() != Some(&p.stage) {
                    stages.push(p.stage);
                }
            })
            .await
            .unwrap();

        assert_eq!(
            stages,
            [
                IndexStage::Chunking,
                IndexStage::Embedding,
                IndexStage::Indexing,
                IndexStage::Done
            ]
        );
    }

    #[tokio::test]
    async fn aborted_build_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store");
        let signal = AbortSignal::new();
        signal.abort();

        let result = builder()
            .with_abort(signal)
            .build_and_save(documents(), &store, |_| {})
            .await;
        assert!(matches!(result, Err(RagError::Aborted)));
        assert!(!store.exists());
    }

    #[tokio::test]
    async fn abort_during_embedding_stops_the_build() {
        let signal = AbortSignal::new();
        let trigger = signal.clone();
        let result = builder()
            .with_abort(signal)
            .build(documents(), |p| {
                if p.stage == IndexStage::Embedding {
                    trigger.abort();
                }
            })
            .await;
        assert!(matches!(result, Err(RagError::Aborted)));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let config = RagConfig::builder().chunking(100, 100).build();
        let result = IndexBuilder::new(Arc::new(Letters), config)
            .build(documents(), |_| {})
            .await;
        assert!(matches!(result, Err(RagError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn saved_corpus_answers_identically() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store");
        let config = RagConfig::builder().index_kind(IndexKind::Hnsw).build();
        let built = IndexBuilder::new(Arc::new(Letters), config.clone())
            .build_and_save(documents(), &store, |_| {})
            .await
            .unwrap();
        let loaded = Corpus::load(&store, Arc::new(Letters)).unwrap();

        for question in ["solar funding", "wind turbines", "billion"] {
            let before = built.retriever(&config).query(question, 2).await.unwrap();
            let after = loaded.retriever(&config).query(question, 2).await.unwrap();
            assert_eq!(before, after);
        }
    }

    #[tokio::test]
    async fn shared_corpus_swaps_atomically() {
        let shared = SharedCorpus::new(RagConfig::default());
        assert!(shared.query("solar", 3).await.unwrap().is_empty());
        assert!(matches!(
            shared.query("solar", 0).await,
            Err(RagError::InvalidArgument(_))
        ));

        let first = builder().build(documents(), |_| {}).await.unwrap();
        assert!(shared.publish(first).is_none());
        let before = shared.snapshot().unwrap();
        assert_eq!(shared.query("solar", 3).await.unwrap()[0].chunk.id, "solar.pdf#chunk_0");

        let second = builder()
            .build(vec![Document::new("hydro.pdf", "Hydro dams")], |_| {})
            .await
            .unwrap();
        let previous = shared.publish(second).unwrap();
        assert!(Arc::ptr_eq(&before, &previous));
        assert_eq!(before.len(), 2);
        assert_eq!(shared.snapshot().unwrap().len(), 1);
    }
}
