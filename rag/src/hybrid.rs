//! Weighted reciprocal rank fusion of vector and keyword retrieval.

use std::collections::HashMap;

use crate::config::RagConfig;
use crate::error::{RagError, Result};
use crate::retriever::Retriever;
use crate::types::SearchResult;

/// Rank offset from the original RRF paper (Cormack, Clarke and Buettcher, 2009).
pub const RRF_K: f32 = 60.0;

/// Fuses ranked lists with weighted reciprocal rank fusion.
///
/// Each `(results, weight)` list contributes `weight / (rrf_k + rank)` to every chunk
/// it contains, with 1-based ranks. Chunks are identified by id. The output is sorted
/// by fused score, equal scores keep the order in which chunks first appear across
/// the lists, and it is truncated to `k`.
#[must_use]
pub fn reciprocal_rank_fusion(
    lists: &[(Vec<SearchResult>, f32)],
    rrf_k: f32,
    k: usize,
) -> Vec<SearchResult> {
    let mut fused: Vec<SearchResult> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for (results, weight) in lists {
        for (rank, result) in results.iter().enumerate() {
            let contribution = weight / (rrf_k + (rank + 1) as f32);
            match positions.get(result.chunk.id.as_str()) {
                Some(&position) => fused[position].score += contribution,
                None => {
                    positions.insert(&result.chunk.id, fused.len());
                    fused.push(SearchResult::new(result.chunk.clone(), contribution));
                }
            }
        }
    }

    fused.sort_by(|a, b| b.score.total_cmp(&a.score));
    fused.truncate(k);
    fused
}

/// Combines a semantic and a lexical retriever.
///
/// Both sub-retrievers are queried concurrently. If one of them fails the other's
/// ranking is used alone; only when both fail does the query fail.
#[derive(Debug, Clone)]
pub struct HybridRetriever<V, K> {
    vector: V,
    keyword: K,
    vector_weight: f32,
    keyword_weight: f32,
    rrf_k: f32,
}

impl<V: Retriever, K: Retriever> HybridRetriever<V, K> {
    /// Creates a retriever with weights 0.7 (vector) and 0.3 (keyword).
    #[must_use]
    pub const fn new(vector: V, keyword: K) -> Self {
        Self {
            vector,
            keyword,
            vector_weight: 0.7,
            keyword_weight: 0.3,
            rrf_k: RRF_K,
        }
    }

    /// Creates a retriever using the fusion settings of `config`.
    #[must_use]
    pub const fn from_config(vector: V, keyword: K, config: &RagConfig) -> Self {
        Self {
            vector,
            keyword,
            vector_weight: config.vector_weight,
            keyword_weight: config.keyword_weight,
            rrf_k: config.rrf_k,
        }
    }

    /// Overrides the fusion weights.
    #[must_use]
    pub const fn with_weights(mut self, vector: f32, keyword: f32) -> Self {
        self.vector_weight = vector;
        self.keyword_weight = keyword;
        self
    }

    /// Returns the vector retriever.
    pub const fn vector(&self) -> &V {
        &self.vector
    }

    /// Returns the keyword retriever.
    pub const fn keyword(&self) -> &K {
        &self.keyword
    }

    /// Queries both retrievers with `k` and fuses their rankings.
    ///
    /// # Errors
    /// Returns [`RagError::InvalidArgument`] if `k == 0` and
    /// [`RagError::ExternalServiceUnavailable`] if both retrievers fail.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(RagError::InvalidArgument("k must be positive".into()));
        }

        let (vector, keyword) =
            futures::join!(self.vector.query(text, k), self.keyword.query(text, k));

        let (vector, keyword) = match (vector, keyword) {
            (Ok(vector), Ok(keyword)) => (vector, keyword),
            (Ok(vector), Err(error)) => {
                tracing::warn!(%error, "keyword retrieval failed, using vector results only");
                (vector, Vec::new())
            }
            (Err(error), Ok(keyword)) => {
                tracing::warn!(%error, "vector retrieval failed, using keyword results only");
                (Vec::new(), keyword)
            }
            (Err(vector), Err(keyword)) => {
                return Err(RagError::ExternalServiceUnavailable(format!(
                    "vector retrieval failed ({vector}) and keyword retrieval failed ({keyword})"
                )));
            }
        };

        Ok(reciprocal_rank_fusion(
            &[(vector, self.vector_weight), (keyword, self.keyword_weight)],
            self.rrf_k,
            k,
        ))
    }
}

impl<V: Retriever, K: Retriever> Retriever for HybridRetriever<V, K> {
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
    use crate::dedup::content_hash;
    use crate::types::Chunk;

    fn result(id: &str, score: f32) -> SearchResult {
        SearchResult::new(Chunk::new(id, id, "doc", 0, content_hash(id)), score)
    }

    fn ids(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.chunk.id.as_str()).collect()
    }

    /// Returns a fixed ranking regardless of the query.
    struct Fixed(Vec<&'static str>);

    impl Retriever for Fixed {
        async fn query(&self, _text: &str, k: usize) -> Result<Vec<SearchResult>> {
            Ok(self.0.iter().take(k).map(|id| result(id, 1.0)).collect())
        }
    }

    struct Broken;

    impl Retriever for Broken {
        async fn query(&self, _text: &str, _k: usize) -> Result<Vec<SearchResult>> {
            Err(RagError::Embedding(anyhow::anyhow!("embedding service down")))
        }
    }

    #[test]
    fn weighted_fusion_scores() {
        let fused = reciprocal_rank_fusion(
            &[
                (vec![result("a", 0.9), result("b", 0.8)], 0.7),
                (vec![result("b", 12.0), result("c", 3.0)], 0.3),
            ],
            60.0,
            10,
        );

        assert_eq!(ids(&fused), ["b", "a", "c"]);
        let b = 0.7 / 62.0 + 0.3 / 61.0;
        assert!((fused[0].score - b).abs() < 1e-6);
        assert!((fused[1].score - 0.7 / 61.0).abs() < 1e-6);
        assert!((fused[2].score - 0.3 / 62.0).abs() < 1e-6);
    }

    #[test]
    fn found_by_both_outranks_found_by_one() {
        let fused = reciprocal_rank_fusion(
            &[
                (vec![result("solo", 1.0), result("both", 1.0)], 0.5),
                (vec![result("both", 1.0)], 0.5),
            ],
            60.0,
            10,
        );
        assert_eq!(fused[0].chunk.id, "both");
        assert!(fused[0].score > fused[1].score);
    }

    #[test]
    fn ties_keep_first_appearance() {
        let fused = reciprocal_rank_fusion(
            &[
                (vec![result("v", 1.0)], 0.5),
                (vec![result("k", 1.0)], 0.5),
            ],
            60.0,
            10,
        );
        assert_eq!(ids(&fused), ["v", "k"]);
    }

    #[tokio::test]
    async fn truncates_to_k() {
        let hybrid = HybridRetriever::new(Fixed(vec!["a", "b", "c"]), Fixed(vec!["d", "e", "f"]));
        let results = hybrid.query("anything", 2).await.unwrap();
        assert_eq!(ids(&results), ["a", "b"]);
    }

    #[tokio::test]
    async fn deterministic_across_calls() {
        let hybrid = HybridRetriever::new(Fixed(vec!["a", "b", "c"]), Fixed(vec!["c", "x", "a"]));
        let first = hybrid.query("q", 3).await.unwrap();
        let second = hybrid.query("q", 3).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn degrades_to_surviving_retriever() {
        let hybrid = HybridRetriever::new(Broken, Fixed(vec!["k1", "k2"]));
        assert_eq!(ids(&hybrid.query("q", 3).await.unwrap()), ["k1", "k2"]);

        let hybrid = HybridRetriever::new(Fixed(vec!["v1"]), Broken);
        assert_eq!(ids(&hybrid.query("q", 3).await.unwrap()), ["v1"]);
    }

    #[tokio::test]
    async fn fails_when_both_fail() {
        let hybrid = HybridRetriever::new(Broken, Broken);
        assert!(matches!(
            hybrid.query("q", 3).await,
            Err(RagError::ExternalServiceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn zero_k_is_invalid() {
        let hybrid = HybridRetriever::new(Fixed(vec!["a"]), Fixed(vec!["b"]));
        assert!(matches!(
            hybrid.query("q", 0).await,
            Err(RagError::InvalidArgument(_))
        ));
    }
}
