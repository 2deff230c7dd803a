//! Text chunking strategies.
//!
//! This module provides the [`Chunker`] trait and the [`RecursiveChunker`] used by the
//! indexing pipeline.

mod recursive;

pub use recursive::RecursiveChunker;

use crate::error::Result;
use crate::types::{Chunk, Document};

/// Trait for text chunking strategies.
///
/// Chunkers split documents into smaller pieces that can be individually embedded
/// and searched. Implementations must be deterministic: the same document always
/// yields the same chunks.
pub trait Chunker: Send + Sync {
    /// Splits a document into chunks.
    ///
    /// Chunk ids are derived from the document id with [`Chunk::id_for`]. Empty text
    /// yields no chunks.
    ///
    /// # Errors
    /// Implementations report unusable input as [`crate::RagError::InvalidArgument`].
    fn chunk(&self, doc: &Document) -> Result<Vec<Chunk>>;

    /// Returns the name of this chunking strategy.
    fn name(&self) -> &'static str;
}
