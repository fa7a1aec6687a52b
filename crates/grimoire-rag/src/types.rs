//! Domain types shared by the ingestion and query pipelines.

use serde::{Deserialize, Serialize};

/// Format a document was loaded from, one variant per supported format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    PlainText,
    Markdown,
    Csv,
    Html,
    Email,
    Docx,
    Pdf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Stable source identifier: the originating file path.
    pub source: String,
    pub content_type: ContentType,
}

/// Normalized plain-text document. Transient: exists only between
/// loading and chunking within a single ingestion run.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

/// A bounded, possibly-overlapping passage of a source document — the
/// unit that gets embedded, indexed and retrieved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    /// Back-reference to the originating document's source identifier.
    pub source: String,
    /// Position within the parent document.
    pub seq: usize,
}

/// The durable unit stored by the vector index. Never mutated after
/// ingestion; replaced only by a full rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Content hash of the chunk, stable across re-ingestions.
    pub id: String,
    pub vector: Vec<f32>,
    pub chunk: Chunk,
}

/// A retrieved chunk with its similarity score. Higher is more relevant.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// One passage supplied to the generation step, surfaced verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePassage {
    pub source: String,
    pub content: String,
}

/// Final answer for a query, together with the exact passages the
/// generation was conditioned on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub query: String,
    pub text: String,
    /// Deterministic function of the retrieved set — never inferred
    /// from the generated text.
    pub sources: Vec<SourcePassage>,
    /// `false` when the answer was produced without any retrieved
    /// context (only possible when ungrounded answers are enabled).
    pub grounded: bool,
}

impl IndexEntry {
    /// Build an entry for a chunk, deriving the id from its identity
    /// (source, position and content).
    #[must_use]
    pub fn new(chunk: Chunk, vector: Vec<f32>) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(chunk.source.as_bytes());
        hasher.update(&chunk.seq.to_le_bytes());
        hasher.update(chunk.content.as_bytes());
        Self {
            id: hasher.finalize().to_hex().to_string(),
            vector,
            chunk,
        }
    }
}

impl From<&Chunk> for SourcePassage {
    fn from(chunk: &Chunk) -> Self {
        Self {
            source: chunk.source.clone(),
            content: chunk.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_chunk(content: &str, seq: usize) -> Chunk {
        Chunk {
            content: content.to_owned(),
            source: "docs/a.txt".to_owned(),
            seq,
        }
    }

    #[test]
    fn entry_id_is_stable() {
        let a = IndexEntry::new(make_chunk("text", 0), vec![0.0; 4]);
        let b = IndexEntry::new(make_chunk("text", 0), vec![1.0; 4]);
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn entry_id_distinguishes_position() {
        let a = IndexEntry::new(make_chunk("text", 0), vec![0.0; 4]);
        let b = IndexEntry::new(make_chunk("text", 1), vec![0.0; 4]);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn source_passage_copies_chunk_fields() {
        let chunk = make_chunk("body", 2);
        let passage = SourcePassage::from(&chunk);
        assert_eq!(passage.source, "docs/a.txt");
        assert_eq!(passage.content, "body");
    }
}
