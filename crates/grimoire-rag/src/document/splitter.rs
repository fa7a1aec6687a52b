//! Overlapping fixed-size text chunking.
//!
//! Sizes are in characters. Every chunk is a literal substring of the
//! source document, so concatenating chunks minus their overlap regions
//! reconstructs the original text exactly.

use crate::types::{Chunk, Document};

#[derive(Debug, Clone)]
pub struct SplitterConfig {
    /// Maximum chunk length, in characters.
    pub chunk_size: usize,
    /// Exact number of characters adjacent chunks share. Must be
    /// smaller than `chunk_size`.
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    /// # Panics
    ///
    /// Panics if `chunk_overlap >= chunk_size` or `chunk_size == 0`;
    /// [`crate::Config::load`] validates this before construction.
    #[must_use]
    pub fn new(config: SplitterConfig) -> Self {
        assert!(config.chunk_size > 0, "chunk_size must be positive");
        assert!(
            config.chunk_overlap < config.chunk_size,
            "chunk_overlap must be smaller than chunk_size"
        );
        Self { config }
    }

    /// Split one document into overlapping chunks with sequential
    /// `seq` indices.
    #[must_use]
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        split_text(
            &document.content,
            self.config.chunk_size,
            self.config.chunk_overlap,
        )
        .into_iter()
        .enumerate()
        .map(|(seq, content)| Chunk {
            content,
            source: document.metadata.source.clone(),
            seq,
        })
        .collect()
    }

    /// Split a batch of documents; `seq` restarts per document.
    #[must_use]
    pub fn split_all(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|d| self.split(d)).collect()
    }
}

/// Cut `text` into pieces of at most `chunk_size` characters where
/// adjacent pieces share exactly `overlap` trailing/leading characters.
///
/// Each cut point is chosen by a prioritized scan of the window:
/// paragraph break, then sentence end, then line break, then word
/// boundary, then a hard character cut.
fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let hard_end = (start + chunk_size).min(chars.len());
        let end = if hard_end == chars.len() {
            hard_end
        } else {
            let found = best_break(&chars, start, hard_end);
            // The next chunk starts `overlap` before the cut; a cut too
            // close to `start` would stall, so fall back to a hard cut.
            if found > start + overlap { found } else { hard_end }
        };

        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start = end - overlap;
    }

    chunks
}

/// Highest-priority break position in `(start, hard_end]`, scanning
/// backwards so the cut lands as late as the delimiter allows.
fn best_break(chars: &[char], start: usize, hard_end: usize) -> usize {
    // Paragraph break: cut after the blank line.
    for i in (start + 1..hard_end).rev() {
        if chars[i] == '\n' && chars[i - 1] == '\n' {
            return i + 1;
        }
    }
    // Sentence end followed by whitespace: cut after the whitespace.
    for i in (start + 1..hard_end).rev() {
        if matches!(chars[i - 1], '.' | '!' | '?') && chars[i].is_whitespace() {
            return i + 1;
        }
    }
    // Line break, then any word boundary.
    for i in (start + 1..hard_end).rev() {
        if chars[i - 1] == '\n' {
            return i;
        }
    }
    for i in (start + 1..hard_end).rev() {
        if chars[i - 1].is_whitespace() {
            return i;
        }
    }
    hard_end
}
