//! The knowledge-base list: document locations to index, one per line.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{RagError, Result};

/// Default file name of the knowledge-base list.
pub const DEFAULT_KNOWLEDGE_BASE: &str = "knowledge_base.txt";

/// An append-only text file of document URLs or paths.
///
/// Every entry occupies one line terminated by `\n`. A missing file reads as an empty
/// list and is created by the first [`KnowledgeBase::append`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeBase {
    path: PathBuf,
}

impl KnowledgeBase {
    /// Opens the list stored at `path`. Nothing is read until asked.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns every non-blank entry, trimmed, in file order.
    ///
    /// # Errors
    /// Returns [`RagError::Persistence`] if the file exists but cannot be read.
    pub fn urls(&self) -> Result<Vec<String>> {
        Ok(self
            .read()?
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect())
    }

    /// Returns at most the first `n` entries, as a batch build consumes them.
    ///
    /// # Errors
    /// See [`KnowledgeBase::urls`].
    pub fn first(&self, n: usize) -> Result<Vec<String>> {
        let mut urls = self.urls()?;
        urls.truncate(n);
        Ok(urls)
    }

    /// Appends `url` unless a line equal to it is already present.
    ///
    /// Returns `true` if the entry was written. A file whose last line lacks a newline
    /// gets one first, so the new entry always starts on its own line.
    ///
    /// # Errors
    /// Returns [`RagError::InvalidArgument`] for a blank URL or one spanning several
    /// lines, and [`RagError::Persistence`] if the file cannot be read or written.
    pub fn append(&self, url: &str) -> Result<bool> {
        let url = url.trim();
        if url.is_empty() {
            return Err(RagError::InvalidArgument("url must not be empty".into()));
        }
        if url.contains(['\n', '\r']) {
            return Err(RagError::InvalidArgument(
                "url must fit on a single line".into(),
            ));
        }

        let existing = self.read()?;
        if existing.lines().any(|line| line == url) {
            tracing::debug!(url, path = %self.path.display(), "already in knowledge base");
            return Ok(false);
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.error(e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.error(e))?;

        let mut line = String::with_capacity(url.len() + 2);
        if !existing.is_empty() && !existing.ends_with('\n') {
            line.push('\n');
        }
        line.push_str(url);
        line.push('\n');
        file.write_all(line.as_bytes()).map_err(|e| self.error(e))?;

        tracing::info!(url, path = %self.path.display(), "added to knowledge base");
        Ok(true)
    }

    fn read(&self) -> Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(self.error(e)),
        }
    }

    fn error(&self, source: io::Error) -> RagError {
        RagError::Persistence {
            path: self.path.clone(),
            source,
        }
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new(DEFAULT_KNOWLEDGE_BASE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let kb = KnowledgeBase::new(dir.path().join("kb.txt"));
        assert!(kb.urls().unwrap().is_empty());
        assert!(!kb.path().exists());
    }

    #[test]
    fn append_creates_file_and_skips_duplicates() {
        let dir = tempdir().unwrap();
        let kb = KnowledgeBase::new(dir.path().join("nested").join("kb.txt"));

        assert!(kb.append("https://example.com/a.pdf").unwrap());
        assert!(kb.append("https://example.com/b.pdf").unwrap());
        assert!(!kb.append("https://example.com/a.pdf").unwrap());
        assert!(!kb.append("  https://example.com/a.pdf \n").unwrap());

        let text = fs::read_to_string(kb.path()).unwrap();
        assert_eq!(text, "https://example.com/a.pdf\nhttps://example.com/b.pdf\n");
        assert_eq!(
            text.lines().filter(|l| *l == "https://example.com/a.pdf").count(),
            1
        );
    }

    #[test]
    fn missing_trailing_newline_is_repaired() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kb.txt");
        fs::write(&path, "https://example.com/a.pdf").unwrap();

        let kb = KnowledgeBase::new(&path);
        assert!(kb.append("https://example.com/b.pdf").unwrap());
        assert_eq!(
            kb.urls().unwrap(),
            ["https://example.com/a.pdf", "https://example.com/b.pdf"]
        );
    }

    #[test]
    fn blank_lines_and_padding_are_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kb.txt");
        fs::write(&path, "  a.pdf \n\n\r\nb.pdf\r\nc.pdf\n").unwrap();

        let kb = KnowledgeBase::new(&path);
        assert_eq!(kb.urls().unwrap(), ["a.pdf", "b.pdf", "c.pdf"]);
        assert_eq!(kb.first(2).unwrap(), ["a.pdf", "b.pdf"]);
        assert_eq!(kb.first(10).unwrap().len(), 3);
    }

    #[test]
    fn invalid_urls_are_rejected() {
        let dir = tempdir().unwrap();
        let kb = KnowledgeBase::new(dir.path().join("kb.txt"));
        assert!(matches!(kb.append("   "), Err(RagError::InvalidArgument(_))));
        assert!(matches!(
            kb.append("a.pdf\nb.pdf"),
            Err(RagError::InvalidArgument(_))
        ));
        assert!(!kb.path().exists());
    }
}
