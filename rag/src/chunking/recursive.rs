//! Recursive separator-based chunking.

use std::collections::VecDeque;

use crate::config::RagConfig;
use crate::dedup::content_hash;
use crate::error::{RagError, Result};
use crate::types::{Chunk, Document};

use super::Chunker;

/// Break points tried in order: paragraph, line, sentence, word, character.
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

const CHARACTERS: &[String] = &[String::new()];

/// Splits text on the coarsest separator that occurs in it, recursing into finer
/// separators only for pieces that are still too long, then greedily merges adjacent
/// pieces back up to `chunk_size` characters.
///
/// Consecutive chunks of a document share at most `chunk_overlap` characters. Sizes are
/// counted in `char`s, so multi-byte text is never cut inside a code point.
///
/// # Example
///
/// ```rust
/// use ragbot_rag::chunking::{Chunker, RecursiveChunker};
/// use ragbot_rag::Document;
///
/// let chunker = RecursiveChunker::new(500, 100).unwrap();
/// let doc = Document::new("doc1", "A short document.");
/// let chunks = chunker.chunk(&doc).unwrap();
/// assert_eq!(chunks.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// Creates a chunker with the default separators.
    ///
    /// # Errors
    /// Returns [`RagError::InvalidArgument`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::InvalidArgument("chunk_size must be positive".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::InvalidArgument(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(ToString::to_string).collect(),
        })
    }

    /// Creates a chunker from the pipeline configuration.
    ///
    /// # Errors
    /// See [`RecursiveChunker::new`].
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Replaces the separator list. Pieces that no separator can shrink are cut by
    /// character.
    #[must_use]
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    /// Maximum characters per chunk.
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Maximum characters shared by consecutive chunks.
    #[must_use]
    pub const fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Splits raw text into trimmed, non-empty chunk texts.
    #[must_use]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_with(text, &self.separators)
    }

    fn split_with(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map_or("", String::as_str);
        let mut remaining: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut pending = Vec::new();
        for piece in split_keeping_end(text, separator) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }
            if separator.is_empty() {
                push_trimmed(piece, &mut chunks);
            } else if remaining.is_empty() {
                chunks.extend(self.split_with(piece, CHARACTERS));
            } else {
                chunks.extend(self.split_with(piece, remaining));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }
        chunks
    }

    /// Greedily packs pieces, keeping a tail of at most `chunk_overlap` characters as
    /// the head of the next chunk.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                push_trimmed(&concat(&window), &mut chunks);
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    let Some((_, front)) = window.pop_front() else {
                        break;
                    };
                    total -= front;
                }
            }
            window.push_back((piece, len));
            total += len;
        }
        push_trimmed(&concat(&window), &mut chunks);
        chunks
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, doc: &Document) -> Result<Vec<Chunk>> {
        let chunks = self
            .split_text(&doc.text)
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let hash = content_hash(&text);
                Chunk::with_metadata(
                    Chunk::id_for(&doc.id, index),
                    text,
                    &doc.id,
                    index,
                    hash,
                    doc.metadata.clone(),
                )
            })
            .collect();
        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "recursive"
    }
}

/// Splits `text` after every occurrence of `separator`, so each piece but the last
/// ends with the separator and a sentence keeps its full stop. An empty separator
/// yields single characters.
fn split_keeping_end<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, matched) in text.match_indices(separator) {
        let end = pos + matched.len();
        pieces.push(&text[start..end]);
        start = end;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn concat(window: &VecDeque<(&str, usize)>) -> String {
    window.iter().map(|(piece, _)| *piece).collect()
}

fn push_trimmed(text: &str, out: &mut Vec<String>) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn short_text_is_single_chunk() {
        let chunker = RecursiveChunker::new(500, 100).unwrap();
        let text = "Forty characters of text, give or take..";
        assert_eq!(text.len(), 40);
        let chunks = chunker.chunk(&Document::new("doc1", text)).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "doc1#chunk_0");
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].source_id, "doc1");
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].content_hash, content_hash(text));
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunker = RecursiveChunker::new(500, 100).unwrap();
        assert!(chunker.chunk(&Document::new("doc1", "")).unwrap().is_empty());
        assert!(chunker.chunk(&Document::new("doc1", " \n\n ")).unwrap().is_empty());
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let chunker = RecursiveChunker::new(40, 0).unwrap();
        let text = format!("{}\n\n{}", "a".repeat(30), "b".repeat(30));
        assert_eq!(
            chunker.split_text(&text),
            vec!["a".repeat(30), "b".repeat(30)]
        );
    }

    #[test]
    fn consecutive_chunks_overlap() {
        let chunker = RecursiveChunker::new(20, 8).unwrap();
        let text = (0..10).map(|i| format!("w{i:02}")).collect::<Vec<_>>().join(" ");
        let chunks = chunker.split_text(&text);

        assert_eq!(chunks[0], "w00 w01 w02 w03 w04");
        assert_eq!(chunks[1], "w03 w04 w05 w06 w07");
    }

    #[test]
    fn unbroken_text_is_cut_by_character() {
        let chunker = RecursiveChunker::new(10, 2).unwrap();
        let chunks = chunker.split_text(&"x".repeat(25));
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }

    #[test]
    fn multibyte_text_counts_characters() {
        let chunker = RecursiveChunker::new(50, 10).unwrap();
        let text = "Привет, мир. Это проверка разбиения текста. ".repeat(20);
        let chunks = chunker.split_text(&text);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 50));
    }

    #[test]
    fn metadata_is_inherited() {
        let chunker = RecursiveChunker::new(100, 20).unwrap();
        let doc = Document::new("https://example.com/a.pdf", "Some text");
        let chunks = chunker.chunk(&doc).unwrap();
        assert_eq!(chunks[0].source(), "https://example.com/a.pdf");
    }

    #[test]
    fn rejects_overlap_not_below_size() {
        assert!(matches!(
            RecursiveChunker::new(50, 50),
            Err(RagError::InvalidArgument(_))
        ));
        assert!(RecursiveChunker::new(0, 0).is_err());
    }

    #[test]
    fn custom_separators_still_bound_size() {
        let chunker = RecursiveChunker::new(16, 4)
            .unwrap()
            .with_separators(["\n\n"]);
        let chunks = chunker.split_text("short\n\nthis paragraph is far too long to fit");
        assert_eq!(chunks[0], "short");
        assert!(chunks.iter().all(|c| c.chars().count() <= 16));
    }

    #[test]
    fn sentences_keep_their_full_stop() {
        let chunker = RecursiveChunker::new(40, 0).unwrap();
        let text = "Solar output rose sharply. Wind output fell slightly. Hydro held steady.";
        assert_eq!(
            chunker.split_text(text),
            [
                "Solar output rose sharply.",
                "Wind output fell slightly.",
                "Hydro held steady."
            ]
        );
    }

    /// Length of the longest suffix of `left` that is also a prefix of `right`, in chars.
    fn shared_boundary(left: &str, right: &str) -> usize {
        let left: Vec<char> = left.chars().collect();
        let right: Vec<char> = right.chars().collect();
        (1..=left.len().min(right.len()))
            .rev()
            .find(|&len| left[left.len() - len..] == right[..len])
            .unwrap_or(0)
    }

    #[test]
    fn shared_boundary_measures_suffix_prefix() {
        assert_eq!(shared_boundary("w00 w01 w02", "w01 w02 w03"), 7);
        assert_eq!(shared_boundary("abc", "xyz"), 0);
    }

    proptest! {
        #[test]
        fn chunks_respect_size_and_come_from_text(
            text in "[a-zа-я .,\n]{0,2000}",
        ) {
            let chunker = RecursiveChunker::new(500, 100).unwrap();
            let chunks = chunker.split_text(&text);
            for chunk in &chunks {
                prop_assert!(chunk.chars().count() <= 500);
                prop_assert!(!chunk.is_empty());
                prop_assert!(text.contains(chunk.as_str()));
            }
            prop_assert_eq!(chunks.is_empty(), text.trim().is_empty());
        }

        #[test]
        fn consecutive_chunks_share_at_most_the_overlap(
            words in prop::collection::vec("[a-z]{1,12}", 0..400),
        ) {
            let chunker = RecursiveChunker::new(500, 100).unwrap();
            let chunks = chunker.split_text(&words.join(" "));
            for pair in chunks.windows(2) {
                prop_assert!(shared_boundary(&pair[0], &pair[1]) <= 100);
            }
        }

        #[test]
        fn chunking_is_deterministic(text in "[a-z \n]{0,1500}") {
            let chunker = RecursiveChunker::new(120, 30).unwrap();
            prop_assert_eq!(chunker.split_text(&text), chunker.split_text(&text));
        }
    }
}
