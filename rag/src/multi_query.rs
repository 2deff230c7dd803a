//! Multi-query retrieval: search with several phrasings of one question.

use std::collections::HashMap;

use futures::future::join_all;
use ragbot_core::LanguageModel;

use crate::config::RagConfig;
use crate::error::{RagError, Result};
use crate::retriever::Retriever;
use crate::rewrite::QueryRewriter;
use crate::types::SearchResult;

/// Expands each query into paraphrases and unions what the inner retriever finds for
/// each of them.
///
/// Every variant is queried concurrently with the same `k`. The union is deduplicated
/// by chunk id: a chunk keeps the best rank and the highest score it reached under any
/// variant, and the union is ordered by that rank, then by first appearance. The union
/// is not truncated, so it may hold up to `k` chunks per variant.
#[derive(Debug, Clone)]
pub struct MultiQueryRetriever<L, R> {
    rewriter: QueryRewriter<L>,
    inner: R,
    include_original: bool,
}

impl<L: LanguageModel, R: Retriever> MultiQueryRetriever<L, R> {
    /// Wraps `inner`, using only the generated paraphrases.
    #[must_use]
    pub const fn new(rewriter: QueryRewriter<L>, inner: R) -> Self {
        Self {
            rewriter,
            inner,
            include_original: false,
        }
    }

    /// Wraps `inner` with the expansion settings of `config`.
    #[must_use]
    pub const fn from_config(model: L, inner: R, config: &RagConfig) -> Self {
        Self {
            rewriter: QueryRewriter::from_config(model, config),
            inner,
            include_original: config.include_original_query,
        }
    }

    /// Also issues the query itself alongside its paraphrases.
    #[must_use]
    pub const fn include_original(mut self, enabled: bool) -> Self {
        self.include_original = enabled;
        self
    }

    /// Returns the query rewriter.
    pub const fn rewriter(&self) -> &QueryRewriter<L> {
        &self.rewriter
    }

    /// Returns the wrapped retriever.
    pub const fn inner(&self) -> &R {
        &self.inner
    }

    /// Retrieves with every variant of `text` and merges the results.
    ///
    /// Variants whose retrieval fails are skipped with a warning.
    ///
    /// # Errors
    /// Returns [`RagError::InvalidArgument`] if `k == 0`, and the first failure if
    /// retrieval failed for every variant.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(RagError::InvalidArgument("k must be positive".into()));
        }

        let mut variants = self.rewriter.variants(text).await;
        if self.include_original && !variants.iter().any(|v| v == text) {
            variants.insert(0, text.to_string());
        }

        let outcomes = join_all(variants.iter().map(|variant| self.inner.query(variant, k))).await;

        let mut lists = Vec::with_capacity(outcomes.len());
        let mut first_error = None;
        for (variant, outcome) in variants.iter().zip(outcomes) {
            match outcome {
                Ok(results) => lists.push(results),
                Err(error) => {
                    tracing::warn!(%error, variant = %variant, "retrieval failed for query variant");
                    first_error.get_or_insert(error);
                }
            }
        }
        if lists.is_empty()
            && let Some(error) = first_error
        {
            return Err(error);
        }

        let merged = merge_by_rank(lists);
        tracing::debug!(variants = variants.len(), chunks = merged.len(), "multi-query retrieval");
        Ok(merged)
    }
}

impl<L: LanguageModel, R: Retriever> Retriever for MultiQueryRetriever<L, R> {
    fn query(
        &self,
        text: &str,
        k: usize,
    ) -> impl std::future::Future<Output = Result<Vec<SearchResult>>> + Send {
        Self::query(self, text, k)
    }
}

/// Unions ranked lists, keeping one entry per chunk id.
fn merge_by_rank(lists: Vec<Vec<SearchResult>>) -> Vec<SearchResult> {
    struct Merged {
        result: SearchResult,
        best_rank: usize,
        first_seen: usize,
    }

    let mut merged: Vec<Merged> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for list in lists {
        for (rank, result) in list.into_iter().enumerate() {
            if let Some(&position) = positions.get(&result.chunk.id) {
                let entry = &mut merged[position];
                entry.best_rank = entry.best_rank.min(rank);
                entry.result.score = entry.result.score.max(result.score);
            } else {
                positions.insert(result.chunk.id.clone(), merged.len());
                merged.push(Merged {
                    first_seen: merged.len(),
                    best_rank: rank,
                    result,
                });
            }
        }
    }

    merged.sort_by_key(|m| (m.best_rank, m.first_seen));
    merged.into_iter().map(|m| m.result).collect()
}
