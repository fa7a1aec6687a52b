//! Retrieval-augmented question answering over a local document corpus.
//!
//! Two pipelines: ingestion (load → chunk → embed → persist a vector
//! index) and query (embed → nearest-neighbor retrieve → grounded
//! generation with source attribution). [`engine::Engine`] is the
//! long-lived service object tying both together.

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod retriever;
pub mod synthesizer;
pub mod types;

pub use config::Config;
pub use engine::Engine;
pub use error::{RagError, Result};
pub use types::{Answer, Chunk, Document, IndexEntry, ScoredChunk, SourcePassage};
