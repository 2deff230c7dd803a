//! The retrieval capability shared by every search component.

use std::future::Future;
use std::sync::Arc;

use ragbot_core::EmbeddingModel;

use crate::error::Result;
use crate::keyword::KeywordIndex;
use crate::store::VectorStore;
use crate::types::SearchResult;

/// Something that maps a query to ranked chunks.
///
/// Implemented by [`VectorStore`], [`KeywordIndex`], [`crate::HybridRetriever`],
/// [`crate::MultiQueryRetriever`] and [`crate::SharedCorpus`], so the components
/// compose freely.
pub trait Retriever: Send + Sync {
    /// Returns up to `k` chunks relevant to `text`, best first.
    ///
    /// # Errors
    /// Implementations return [`crate::RagError::InvalidArgument`] for `k == 0` and
    /// their own failure otherwise.
    fn query(&self, text: &str, k: usize) -> impl Future<Output = Result<Vec<SearchResult>>> + Send;
}

impl<M: EmbeddingModel> Retriever for VectorStore<M> {
    fn query(&self, text: &str, k: usize) -> impl Future<Output = Result<Vec<SearchResult>>> + Send {
        Self::query(self, text, k)
    }
}

impl Retriever for KeywordIndex {
    fn query(&self, text: &str, k: usize) -> impl Future<Output = Result<Vec<SearchResult>>> + Send {
        let results = Self::query(self, text, k);
        async move { results }
    }
}

impl<R: Retriever> Retriever for &R {
    fn query(&self, text: &str, k: usize) -> impl Future<Output = Result<Vec<SearchResult>>> + Send {
        R::query(self, text, k)
    }
}

impl<R: Retriever> Retriever for Arc<R> {
    fn query(&self, text: &str, k: usize) -> impl Future<Output = Result<Vec<SearchResult>>> + Send {
        R::query(self, text, k)
    }
}
