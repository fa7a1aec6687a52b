use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::document::BatchErrorPolicy;
use crate::error::{RagError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub ingest: IngestConfig,
    pub synthesis: SynthesisConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub source_dir: PathBuf,
    pub index_path: PathBuf,
    /// Chunk length bound, in characters.
    pub chunk_size: usize,
    /// Characters shared between adjacent chunks. Must be < `chunk_size`.
    pub chunk_overlap: usize,
    pub max_file_size: u64,
    /// What a batch ingestion does when one file fails.
    pub on_error: BatchErrorPolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// How many passages to retrieve per query.
    pub target_source_chunks: usize,
    /// Answer without context when retrieval comes back empty, instead
    /// of failing with `NoContext`.
    pub allow_ungrounded: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "mistral:7b".into(),
            embedding_model: "nomic-embed-text".into(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source_dir: "./source_documents".into(),
            index_path: "./data/index.json".into(),
            chunk_size: 500,
            chunk_overlap: 50,
            max_file_size: crate::document::DEFAULT_MAX_FILE_SIZE,
            on_error: BatchErrorPolicy::Abort,
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            target_source_chunks: 4,
            allow_ungrounded: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            ingest: IngestConfig::default(),
            synthesis: SynthesisConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed,
    /// or if the resulting values are inconsistent.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str::<Self>(&content)
                .map_err(|e| RagError::Config(format!("{}: {e}", path.display())))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("GRIMOIRE_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("GRIMOIRE_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("GRIMOIRE_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("GRIMOIRE_SOURCE_DIR") {
            self.ingest.source_dir = v.into();
        }
        if let Ok(v) = std::env::var("GRIMOIRE_INDEX_PATH") {
            self.ingest.index_path = v.into();
        }
    }

    fn validate(&self) -> Result<()> {
        if self.ingest.chunk_size == 0 {
            return Err(RagError::Config("ingest.chunk_size must be positive".into()));
        }
        if self.ingest.chunk_overlap >= self.ingest.chunk_size {
            return Err(RagError::Config(format!(
                "ingest.chunk_overlap ({}) must be smaller than ingest.chunk_size ({})",
                self.ingest.chunk_overlap, self.ingest.chunk_size
            )));
        }
        if self.synthesis.target_source_chunks == 0 {
            return Err(RagError::Config(
                "synthesis.target_source_chunks must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
