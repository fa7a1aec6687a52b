//! Error taxonomy for the ingestion and query pipelines.
//!
//! Per-file failures (`UnsupportedFormat`, `Load`, `FileTooLarge`) carry
//! the identity of the offending file; index- and model-level failures
//! are process-wide so operators can tell a bad document from a broken
//! index or backend.

use std::path::PathBuf;

use grimoire_llm::LlmError;

#[derive(Debug, thiserror::Error)]
pub enum RagError {
    /// Unknown file extension. The caller must fix the input.
    #[error("unsupported format: .{0}")]
    UnsupportedFormat(String),

    /// Extraction failed for one specific file.
    #[error("failed to load {path}: {message}")]
    Load { path: PathBuf, message: String },

    #[error("file too large: {0} bytes")]
    FileTooLarge(u64),

    /// Embedding backend missing or unreachable. Raised eagerly at
    /// engine construction so the service never claims readiness.
    #[error("embedding backend unavailable: {0}")]
    EmbeddingUnavailable(LlmError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("no index found at {0}")]
    IndexNotFound(PathBuf),

    #[error("index corrupt: {0}")]
    IndexCorrupt(String),

    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// No index loaded yet. Transient: retry after ingestion completes.
    #[error("service not ready: no index has been ingested or opened")]
    NotReady,

    #[error("empty query")]
    EmptyQuery,

    /// Retrieval produced nothing and ungrounded answers are disabled.
    #[error("no context retrieved for query")]
    NoContext,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RagError>;

impl RagError {
    /// Wrap an arbitrary extraction failure with the file it came from.
    pub fn load(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Load {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
