//! Configuration for the retrieval pipeline.

use crate::error::{RagError, Result};
use crate::index::IndexKind;

/// Tunables shared by ingestion, indexing and retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct RagConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Maximum characters shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Results requested from each retriever.
    pub top_k: usize,
    /// Weight of the vector ranking in fusion.
    pub vector_weight: f32,
    /// Weight of the keyword ranking in fusion.
    pub keyword_weight: f32,
    /// Reciprocal rank fusion constant.
    pub rrf_k: f32,
    /// Number of paraphrases requested per question.
    pub query_variants: usize,
    /// Whether the (rewritten) question itself is issued alongside its paraphrases.
    pub include_original_query: bool,
    /// Nearest-neighbour structure used for new indices.
    pub index_kind: IndexKind,
    /// Whether chunks with identical text are indexed once.
    pub deduplication: bool,
    /// Cap on documents loaded in one batch build.
    pub max_documents: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
            top_k: 3,
            vector_weight: 0.7,
            keyword_weight: 0.3,
            rrf_k: 60.0,
            query_variants: 3,
            include_original_query: false,
            index_kind: IndexKind::Auto,
            deduplication: true,
            max_documents: 100,
        }
    }
}

impl RagConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for custom configuration.
    #[must_use]
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::new()
    }

    /// Checks that the values can drive a pipeline.
    ///
    /// # Errors
    /// Returns [`RagError::InvalidArgument`] describing the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::InvalidArgument("chunk_size must be positive".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::InvalidArgument(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::InvalidArgument("top_k must be positive".into()));
        }
        for (name, weight) in [
            ("vector_weight", self.vector_weight),
            ("keyword_weight", self.keyword_weight),
        ] {
            if weight.is_nan() || weight <= 0.0 {
                return Err(RagError::InvalidArgument(format!(
                    "{name} must be positive, got {weight}"
                )));
            }
        }
        if self.rrf_k.is_nan() || self.rrf_k < 0.0 {
            return Err(RagError::InvalidArgument("rrf_k must be non-negative".into()));
        }
        if self.max_documents == 0 {
            return Err(RagError::InvalidArgument("max_documents must be positive".into()));
        }
        Ok(())
    }
}

/// Builder for [`RagConfig`].
#[derive(Debug, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Creates a new configuration builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: RagConfig::default(),
        }
    }

    /// Sets the chunk size and overlap, in characters.
    #[must_use]
    pub const fn chunking(mut self, size: usize, overlap: usize) -> Self {
        self.config.chunk_size = size;
        self.config.chunk_overlap = overlap;
        self
    }

    /// Sets the per-retriever result count.
    #[must_use]
    pub const fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Sets the vector and keyword fusion weights. Both must be positive.
    #[must_use]
    pub const fn weights(mut self, vector: f32, keyword: f32) -> Self {
        self.config.vector_weight = vector;
        self.config.keyword_weight = keyword;
        self
    }

    /// Sets the reciprocal rank fusion constant.
    #[must_use]
    pub const fn rrf_k(mut self, k: f32) -> Self {
        self.config.rrf_k = k;
        self
    }

    /// Sets how many paraphrases are requested per question.
    #[must_use]
    pub const fn query_variants(mut self, count: usize) -> Self {
        self.config.query_variants = count;
        self
    }

    /// Issues the question itself alongside its paraphrases.
    #[must_use]
    pub const fn include_original_query(mut self, enabled: bool) -> Self {
        self.config.include_original_query = enabled;
        self
    }

    /// Sets the nearest-neighbour structure for new indices.
    #[must_use]
    pub const fn index_kind(mut self, kind: IndexKind) -> Self {
        self.config.index_kind = kind;
        self
    }

    /// Enables or disables content deduplication.
    #[must_use]
    pub const fn deduplication(mut self, enabled: bool) -> Self {
        self.config.deduplication = enabled;
        self
    }

    /// Caps the number of documents loaded per batch build.
    #[must_use]
    pub const fn max_documents(mut self, limit: usize) -> Self {
        self.config.max_documents = limit;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> RagConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = RagConfig::default();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 100);
        assert_eq!(config.top_k, 3);
        assert!((config.vector_weight - 0.7).abs() < f32::EPSILON);
        assert!((config.keyword_weight - 0.3).abs() < f32::EPSILON);
        assert!((config.rrf_k - 60.0).abs() < f32::EPSILON);
        assert_eq!(config.query_variants, 3);
        assert_eq!(config.max_documents, 100);
        assert!(config.deduplication);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_config() {
        let config = RagConfig::builder()
            .chunking(200, 20)
            .top_k(5)
            .weights(0.5, 0.5)
            .rrf_k(10.0)
            .query_variants(2)
            .include_original_query(true)
            .index_kind(IndexKind::Hnsw)
            .deduplication(false)
            .max_documents(7)
            .build();

        assert_eq!(config.chunk_size, 200);
        assert_eq!(config.chunk_overlap, 20);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.query_variants, 2);
        assert!(config.include_original_query);
        assert_eq!(config.index_kind, IndexKind::Hnsw);
        assert!(!config.deduplication);
        assert_eq!(config.max_documents, 7);
    }

    #[test]
    fn rejects_overlap_not_below_size() {
        let config = RagConfig::builder().chunking(100, 100).build();
        assert!(matches!(
            config.validate(),
            Err(RagError::InvalidArgument(_))
        ));
    }

    #[test]
    fn rejects_zero_weights() {
        let config = RagConfig::builder().weights(0.0, 0.0).build();
        assert!(config.validate().is_err());

        let config = RagConfig::builder().weights(-0.1, 1.0).build();
        assert!(config.validate().is_err());

        for (vector, keyword) in [(1.0, 0.0), (0.0, 1.0), (f32::NAN, 0.5)] {
            let config = RagConfig::builder().weights(vector, keyword).build();
            assert!(matches!(
                config.validate(),
                Err(RagError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn rejects_zero_top_k() {
        assert!(RagConfig::builder().top_k(0).build().validate().is_err());
    }
}
