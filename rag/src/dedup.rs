//! Content hashing and duplicate-chunk filtering.

use std::collections::HashSet;

use xxhash_rust::xxh3::xxh3_64;

use crate::types::Chunk;

/// Computes the content hash stored on every chunk.
#[must_use]
pub fn content_hash(text: &str) -> u64 {
    xxh3_64(text.as_bytes())
}

/// Keeps the first chunk for each distinct content hash, preserving order.
///
/// Chunk ids are left untouched, so a surviving chunk still cites its own document.
#[must_use]
pub fn dedup_chunks(chunks: Vec<Chunk>) -> Vec<Chunk> {
    let mut seen = HashSet::with_capacity(chunks.len());
    let before = chunks.len();
    let kept: Vec<Chunk> = chunks
        .into_iter()
        .filter(|chunk| seen.insert(chunk.content_hash))
        .collect();
    if kept.len() < before {
        tracing::debug!(removed = before - kept.len(), "dropped duplicate chunks");
    }
    kept
}
