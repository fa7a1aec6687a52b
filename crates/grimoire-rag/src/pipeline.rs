//! Ingestion pipeline: load, chunk, embed, persist.
//!
//! One run rebuilds the index from scratch; there is no incremental
//! update. The previous on-disk index stays intact until the new one is
//! fully written.

use std::path::Path;
use std::time::{Duration, Instant};

use grimoire_llm::LlmProvider;

use crate::config::IngestConfig;
use crate::document::{LoaderRegistry, SplitterConfig, TextSplitter};
use crate::error::Result;
use crate::index::VectorIndex;
use crate::types::IndexEntry;

/// What an ingestion run produced.
#[derive(Debug, Clone)]
pub struct IngestionReport {
    pub documents_loaded: usize,
    pub chunks_indexed: usize,
    pub elapsed: Duration,
}

pub struct IngestionPipeline<'a, P> {
    provider: &'a P,
    config: &'a IngestConfig,
    registry: LoaderRegistry,
    splitter: TextSplitter,
}

impl<'a, P: LlmProvider> IngestionPipeline<'a, P> {
    #[must_use]
    pub fn new(provider: &'a P, config: &'a IngestConfig) -> Self {
        Self {
            provider,
            config,
            registry: LoaderRegistry::with_defaults(config.max_file_size),
            splitter: TextSplitter::new(SplitterConfig {
                chunk_size: config.chunk_size,
                chunk_overlap: config.chunk_overlap,
            }),
        }
    }

    /// Rebuild the index at `config.index_path` from every supported
    /// file under `source_dir`, embedding in per-document batches.
    ///
    /// # Errors
    ///
    /// Fails on an unreadable corpus (subject to the configured batch
    /// error policy), an embedding backend failure, a vector of the
    /// wrong width, or an IO error persisting the index.
    pub async fn run(&self, source_dir: &Path, dimension: usize) -> Result<IngestionReport> {
        let started = Instant::now();
        tracing::info!(dir = %source_dir.display(), "ingestion started");

        let documents = self
            .registry
            .load_all(source_dir, self.config.on_error)
            .await?;
        let documents_loaded = documents.len();

        let mut entries = Vec::new();
        for document in &documents {
            let chunks = self.splitter.split(document);
            if chunks.is_empty() {
                tracing::warn!(
                    source = %document.metadata.source,
                    "document is empty after extraction, skipping"
                );
                continue;
            }

            let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
            let vectors = self.provider.embed_batch(&texts).await?;
            entries.extend(
                chunks
                    .into_iter()
                    .zip(vectors)
                    .map(|(chunk, vector)| IndexEntry::new(chunk, vector)),
            );
            tracing::debug!(source = %document.metadata.source, "document embedded");
        }

        let chunks_indexed = entries.len();
        VectorIndex::build(entries, dimension, &self.config.index_path)?;

        let report = IngestionReport {
            documents_loaded,
            chunks_indexed,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            documents = report.documents_loaded,
            chunks = report.chunks_indexed,
            elapsed_ms = report.elapsed.as_millis(),
            "ingestion complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;
    use grimoire_llm::mock::MockProvider;

    fn config(dir: &tempfile::TempDir) -> IngestConfig {
        IngestConfig {
            index_path: dir.path().join("data/index.json"),
            ..IngestConfig::default()
        }
    }

    #[tokio::test]
    async fn ingests_corpus_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus");
        std::fs::create_dir(&corpus).unwrap();
        std::fs::write(corpus.join("a.txt"), "alpha document body").unwrap();
        std::fs::write(corpus.join("b.md"), "# beta\n\nnotes here").unwrap();

        let provider = MockProvider::default();
        let cfg = config(&dir);
        let report = IngestionPipeline::new(&provider, &cfg)
            .run(&corpus, provider.embedding_dim)
            .await
            .unwrap();

        assert_eq!(report.documents_loaded, 2);
        assert_eq!(report.chunks_indexed, 2);
        assert!(provider.embed_calls() >= 2);

        let index = VectorIndex::open(&cfg.index_path).unwrap();
        assert_eq!(index.len(), 2);
    }

    #[tokio::test]
    async fn empty_documents_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus");
        std::fs::create_dir(&corpus).unwrap();
        std::fs::write(corpus.join("empty.txt"), "").unwrap();
        std::fs::write(corpus.join("full.txt"), "content").unwrap();

        let provider = MockProvider::default();
        let cfg = config(&dir);
        let report = IngestionPipeline::new(&provider, &cfg)
            .run(&corpus, provider.embedding_dim)
            .await
            .unwrap();

        assert_eq!(report.documents_loaded, 2);
        assert_eq!(report.chunks_indexed, 1);
    }

    #[tokio::test]
    async fn embedding_failure_aborts_and_keeps_old_index() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus");
        std::fs::create_dir(&corpus).unwrap();
        std::fs::write(corpus.join("a.txt"), "first run").unwrap();

        let good = MockProvider::default();
        let cfg = config(&dir);
        IngestionPipeline::new(&good, &cfg)
            .run(&corpus, good.embedding_dim)
            .await
            .unwrap();

        let bad = MockProvider::failing_embed();
        let err = IngestionPipeline::new(&bad, &cfg)
            .run(&corpus, bad.embedding_dim)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Llm(_)));

        // The failed run never touched the persisted index.
        let index = VectorIndex::open(&cfg.index_path).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn long_document_produces_multiple_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus");
        std::fs::create_dir(&corpus).unwrap();
        std::fs::write(corpus.join("long.txt"), "word ".repeat(300)).unwrap();

        let provider = MockProvider::default();
        let cfg = config(&dir);
        let report = IngestionPipeline::new(&provider, &cfg)
            .run(&corpus, provider.embedding_dim)
            .await
            .unwrap();

        assert_eq!(report.documents_loaded, 1);
        assert!(report.chunks_indexed > 1);
    }

    #[tokio::test]
    async fn missing_corpus_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::default();
        let cfg = config(&dir);
        let result = IngestionPipeline::new(&provider, &cfg)
            .run(&dir.path().join("nope"), provider.embedding_dim)
            .await;
        assert!(result.is_err());
    }
}
