//! Retrieval-augmented question answering over a document corpus.
//!
//! The crate glues any [`EmbeddingModel`](ragbot_core::EmbeddingModel) and
//! [`LanguageModel`](ragbot_core::LanguageModel) to a hybrid retrieval pipeline:
//!
//! - [`IndexBuilder`] cleans, chunks, embeds and indexes documents into a [`Corpus`]
//!   (a [`VectorStore`] plus a BM25 [`KeywordIndex`]).
//! - [`HybridRetriever`] fuses vector and keyword rankings with weighted reciprocal
//!   rank fusion.
//! - [`QueryRewriter`] and [`MultiQueryRetriever`] turn a follow-up question into a
//!   standalone query and search with several paraphrases of it.
//! - [`Assistant::get_response`] runs one conversational turn against a caller-owned
//!   [`Session`] and returns an [`Answer`] citing its sources.
//!
//! Every search component implements [`Retriever`], so they nest freely. Corpora are
//! served through [`SharedCorpus`], which swaps in a rebuilt corpus without blocking
//! queries.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragbot_rag::{Assistant, IndexBuilder, PdfLoader, RagConfig, Session, SharedCorpus, load_documents};
//!
//! let config = RagConfig::default();
//! let documents = load_documents(&PdfLoader::new(), &paths, config.max_documents, |_| {}).await;
//! let corpus = IndexBuilder::new(Arc::clone(&embedder), config.clone())
//!     .build(documents, |_| {})
//!     .await?;
//!
//! let shared = SharedCorpus::new(config.clone());
//! shared.publish(corpus);
//! let assistant = Assistant::new(model, shared, &config);
//!
//! let mut session = Session::with_greeting();
//! let answer = assistant.get_response(&mut session, "What changed in 2023?").await?;
//! println!("{}", answer.render());
//! ```

pub mod chunking;
pub mod index;
pub mod persistence;

mod assistant;
mod cleaning;
mod config;
mod dedup;
mod error;
mod hybrid;
mod indexing;
mod ingest;
mod keyword;
mod knowledge_base;
mod multi_query;
mod retriever;
mod rewrite;
mod session;
mod store;
mod types;

pub use assistant::{Answer, Assistant};
pub use chunking::{Chunker, RecursiveChunker};
pub use cleaning::{BasicCleaner, Cleaner};
pub use config::{RagConfig, RagConfigBuilder};
pub use dedup::{content_hash, dedup_chunks};
pub use error::{RagError, Result};
pub use hybrid::{HybridRetriever, RRF_K, reciprocal_rank_fusion};
pub use index::{IndexKind, VectorIndex};
pub use indexing::{AbortSignal, Corpus, IndexBuilder, IndexProgress, IndexStage, SharedCorpus};
pub use ingest::{
    AUTHOR_KEY, DocumentLoader, PAGE_COUNT_KEY, PdfLoader, TITLE_KEY, ingestion_failure,
    load_documents,
};
pub use keyword::{KeywordIndex, tokenize};
pub use knowledge_base::{DEFAULT_KNOWLEDGE_BASE, KnowledgeBase};
pub use multi_query::MultiQueryRetriever;
pub use retriever::Retriever;
pub use rewrite::{QueryRewriter, parse_variants};
pub use session::{GREETING, Session};
pub use store::{EMBED_BATCH_SIZE, VectorStore};
pub use types::{Chunk, Document, IndexEntry, Metadata, SOURCE_KEY, SearchResult};
