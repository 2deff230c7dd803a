//! BM25 keyword index.

use std::fmt;
use std::sync::Arc;

use bm25::{Document, SearchEngine, SearchEngineBuilder, Tokenizer};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{RagError, Result};
use crate::types::{Chunk, SearchResult};

/// Default term frequency saturation.
pub const DEFAULT_K1: f32 = 1.5;
/// Default document length normalization.
pub const DEFAULT_B: f32 = 0.75;

/// Splits text into lowercase Unicode words.
///
/// Indexing and querying share this function, so a term matches regardless of case
/// or surrounding punctuation.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(str::to_lowercase).collect()
}

/// [`tokenize`] as a `bm25` tokenizer. No stemming or stop words, so any language works.
#[derive(Debug, Clone, Copy, Default)]
struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, input_text: &str) -> Vec<String> {
        tokenize(input_text)
    }
}

/// Lexical search over chunks scored with Okapi BM25.
///
/// Documents are keyed by their position in the corpus. The index is immutable;
/// build a new one whenever the chunk set changes. Cloning is cheap and shares the
/// engine.
#[derive(Clone)]
pub struct KeywordIndex {
    inner: Arc<Bm25>,
}

struct Bm25 {
    chunks: Vec<Chunk>,
    /// `None` for an empty corpus.
    engine: Option<SearchEngine<usize, u32, WordTokenizer>>,
    k1: f32,
    b: f32,
}

impl fmt::Debug for KeywordIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeywordIndex")
            .field("chunks", &self.inner.chunks.len())
            .field("k1", &self.inner.k1)
            .field("b", &self.inner.b)
            .finish()
    }
}

impl KeywordIndex {
    /// Builds an index with the default parameters (`k1 = 1.5`, `b = 0.75`).
    #[must_use]
    pub fn build(chunks: Vec<Chunk>) -> Self {
        Self::with_params(chunks, DEFAULT_K1, DEFAULT_B)
    }

    /// Builds an index with custom BM25 parameters.
    #[must_use]
    pub fn with_params(chunks: Vec<Chunk>, k1: f32, b: f32) -> Self {
        let engine = (!chunks.is_empty()).then(|| {
            let documents: Vec<Document<usize>> = chunks
                .iter()
                .enumerate()
                .map(|(position, chunk)| Document {
                    id: position,
                    contents: chunk.text.clone(),
                })
                .collect();
            SearchEngineBuilder::<usize, u32, WordTokenizer>::with_tokenizer_and_documents(
                WordTokenizer,
                documents,
            )
            .k1(k1)
            .b(b)
            .build()
        });

        Self {
            inner: Arc::new(Bm25 {
                chunks,
                engine,
                k1,
                b,
            }),
        }
    }

    /// Returns up to `k` chunks sharing a term with `text`, best first.
    ///
    /// Only chunks with a positive score are returned; equal scores keep corpus order.
    ///
    /// # Errors
    /// Returns [`RagError::InvalidArgument`] if `k == 0`.
    pub fn query(&self, text: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(RagError::InvalidArgument("k must be positive".into()));
        }
        let bm25 = &self.inner;
        let Some(engine) = &bm25.engine else {
            return Ok(Vec::new());
        };

        let mut ranked: Vec<(usize, f32)> = engine
            .search(text, bm25.chunks.len())
            .into_iter()
            .map(|hit| (hit.document.id, hit.score))
            .filter(|&(position, score)| score > 0.0 && position < bm25.chunks.len())
            .collect();
        ranked.sort_by(|(pa, sa), (pb, sb)| sb.total_cmp(sa).then(pa.cmp(pb)));

        Ok(ranked
            .into_iter()
            .take(k)
            .map(|(position, score)| SearchResult::new(bm25.chunks[position].clone(), score))
            .collect())
    }

    /// Returns the indexed chunks in corpus order.
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.inner.chunks
    }

    /// Returns the number of indexed chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.chunks.len()
    }

    /// Returns `true` if no chunks are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.chunks.is_empty()
    }
}
