//! # Embedding Module
//!
//! This module provides the [`EmbeddingModel`] trait used by the retrieval pipeline.
//!
//! Embeddings are dense vector representations of text that capture semantic meaning.
//! Similar texts produce similar embedding vectors, which is what makes semantic search
//! possible: the vector index stores one embedding per chunk and compares it against the
//! embedding of the user's query.
//!
//! Two properties matter to the rest of the workspace:
//!
//! - **Dimension**: every vector produced by one model has the same length. Persisted indices
//!   record it and refuse to load under a model with a different dimension.
//! - **Determinism**: the same text under the same model yields the same vector, so an index
//!   built today answers the same queries tomorrow.
//!
//! ```rust
//! use ragbot_core::EmbeddingModel;
//!
//! async fn example<T: EmbeddingModel>(model: &T) -> ragbot_core::Result<()> {
//!     let embedding = model.embed("Hello, world!").await?;
//!     assert_eq!(embedding.len(), model.dim());
//!     Ok(())
//! }
//! ```

use alloc::{string::String, vec::Vec};
use core::future::Future;

/// A type alias for an embedding vector of 32-bit floats.
pub type Embedding = Vec<f32>;

/// Converts text to vector representations.
///
/// See the [module documentation](crate::embedding) for more details.
///
/// # Implementation Requirements
///
/// - The [`embed`](EmbeddingModel::embed) method must return vectors with length equal to [`dim`](EmbeddingModel::dim)
/// - [`name`](EmbeddingModel::name) should identify the model so persisted indices can detect a model swap
///
/// # Example
///
/// ```rust
/// use ragbot_core::EmbeddingModel;
///
/// struct MyEmbedding;
///
/// impl EmbeddingModel for MyEmbedding {
///     fn dim(&self) -> usize {
///         384
///     }
///
///     fn name(&self) -> &str {
///         "my-embedding-v1"
///     }
///
///     async fn embed(&self, _text: &str) -> ragbot_core::Result<Vec<f32>> {
///         Ok(vec![0.0; self.dim()])
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let embedding = MyEmbedding.embed("The quick brown fox").await.unwrap();
/// assert_eq!(embedding.len(), 384);
/// # });
/// ```
pub trait EmbeddingModel: Sized + Send + Sync {
    /// Returns the embedding vector dimension.
    fn dim(&self) -> usize;

    /// Returns an identifier for the underlying model.
    ///
    /// Defaults to an empty string, meaning "unnamed". Indices built with an unnamed model
    /// only check the dimension on load.
    fn name(&self) -> &str {
        ""
    }

    /// Converts text to an embedding vector of length [`Self::dim`](EmbeddingModel::dim).
    fn embed(&self, text: &str) -> impl Future<Output = crate::Result<Embedding>> + Send;

    /// Converts a batch of texts, returning vectors in input order.
    ///
    /// # Note for Implementors
    /// The default implementation calls [`embed`](EmbeddingModel::embed) once per text.
    /// Remote providers should override it with a single batched request.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = crate::Result<Vec<Embedding>>> + Send {
        async move {
            let mut vectors = Vec::with_capacity(texts.len());
            for text in texts {
                vectors.push(self.embed(text).await?);
            }
            Ok(vectors)
        }
    }
}
