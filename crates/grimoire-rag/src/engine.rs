//! Long-lived service object over the ingestion and query pipelines.
//!
//! The engine owns the provider and the current index. Queries take an
//! `Arc` snapshot of the index, so an ingestion finishing mid-query
//! swaps the shared slot without disturbing queries already running
//! against the previous index.

use std::sync::Arc;

use grimoire_llm::LlmProvider;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::pipeline::{IngestionPipeline, IngestionReport};
use crate::retriever::Retriever;
use crate::synthesizer::{StreamingAnswer, Synthesizer};
use crate::types::Answer;

#[derive(Debug)]
pub struct Engine<P> {
    provider: P,
    config: Config,
    /// Embedding width, captured from a probe at construction.
    dimension: usize,
    index: RwLock<Option<Arc<VectorIndex>>>,
}

impl<P: LlmProvider> Engine<P> {
    /// Probe the embedding backend once and capture its dimension.
    /// Construction fails fast instead of letting the first ingestion
    /// or query discover a dead backend.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingUnavailable`] when the probe fails.
    pub async fn new(provider: P, config: Config) -> Result<Self> {
        let probe = provider
            .embed("dimension probe")
            .await
            .map_err(RagError::EmbeddingUnavailable)?;
        tracing::info!(
            provider = provider.name(),
            dimension = probe.len(),
            "embedding backend ready"
        );
        Ok(Self {
            provider,
            config,
            dimension: probe.len(),
            index: RwLock::new(None),
        })
    }

    /// Load the index persisted at the configured path, if any.
    /// Returns `false` when none exists yet.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexCorrupt`] for an unreadable file and
    /// [`RagError::DimensionMismatch`] when the persisted index was
    /// built with a different embedding model width.
    pub async fn open_existing(&self) -> Result<bool> {
        let index = match VectorIndex::open(&self.config.ingest.index_path) {
            Ok(index) => index,
            Err(RagError::IndexNotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        if index.dimension() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                got: index.dimension(),
            });
        }
        *self.index.write().await = Some(Arc::new(index));
        Ok(true)
    }

    /// Rebuild the index from the configured source directory and make
    /// it the active one.
    ///
    /// # Errors
    ///
    /// Propagates loader, embedding and persistence failures; the
    /// previously active index stays in place on any failure.
    pub async fn run_ingestion(&self) -> Result<IngestionReport> {
        let pipeline = IngestionPipeline::new(&self.provider, &self.config.ingest);
        let report = pipeline
            .run(&self.config.ingest.source_dir, self.dimension)
            .await?;

        let index = VectorIndex::open(&self.config.ingest.index_path)?;
        *self.index.write().await = Some(Arc::new(index));
        Ok(report)
    }

    /// Answer a question against the active index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyQuery`] for a blank question before any
    /// backend call, [`RagError::NotReady`] when no index is active,
    /// and the retrieval or synthesis error otherwise.
    pub async fn run_query(&self, query: &str) -> Result<Answer> {
        let (query, index) = self.prepare_query(query).await?;
        let retrieved = Retriever::new(&self.provider, &index)
            .retrieve(&query, self.config.synthesis.target_source_chunks)
            .await?;
        Synthesizer::new(&self.provider, self.config.synthesis.allow_ungrounded)
            .answer(&query, &retrieved)
            .await
    }

    /// Streaming variant of [`Engine::run_query`]. Sources are final
    /// before the first token.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Engine::run_query`].
    pub async fn run_query_stream(&self, query: &str) -> Result<StreamingAnswer> {
        let (query, index) = self.prepare_query(query).await?;
        let retrieved = Retriever::new(&self.provider, &index)
            .retrieve(&query, self.config.synthesis.target_source_chunks)
            .await?;
        Synthesizer::new(&self.provider, self.config.synthesis.allow_ungrounded)
            .answer_stream(&query, &retrieved)
            .await
    }

    async fn prepare_query(&self, query: &str) -> Result<(String, Arc<VectorIndex>)> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::EmptyQuery);
        }
        let index = self
            .index
            .read()
            .await
            .clone()
            .ok_or(RagError::NotReady)?;
        Ok((query.to_owned(), index))
    }

    pub async fn is_ready(&self) -> bool {
        self.index.read().await.is_some()
    }

    /// Number of entries in the active index, if one is loaded.
    pub async fn index_len(&self) -> Option<usize> {
        self.index.read().await.as_ref().map(|i| i.len())
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}
