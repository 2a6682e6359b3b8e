//! Pipeline configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `SCOUT_*` environment variables, then command-line flags.
//!
//! ```toml
//! context_dir = "context"
//! chunk_size = 2000
//! chunk_overlap = 200
//! top_k = 5
//! mode = "lexical"
//!
//! [embedding]
//! model_name = "all-MiniLM-L6-v2"
//! ```

use crate::storage::DistanceMetric;
use clap::ValueEnum;
use scout_ai_context::{Chunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use scout_ai_embed::EmbedConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid chunk parameters: {0}")]
    Chunk(#[from] scout_ai_context::ChunkError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which scoring strategy answers queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    #[default]
    Lexical,
    Vector,
}

impl std::str::FromStr for RetrievalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true).map_err(|_| format!("Invalid mode: {s}"))
    }
}

impl std::fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrievalMode::Lexical => write!(f, "lexical"),
            RetrievalMode::Vector => write!(f, "vector"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Folder whose files are ingested
    pub context_dir: PathBuf,
    /// Fragment array written by `ingest`
    pub fragments_path: PathBuf,
    /// Fragments plus embeddings written by `embed`
    pub vector_index_path: PathBuf,
    /// Base system prompt
    pub prompt_path: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub mode: RetrievalMode,
    pub metric: DistanceMetric,
    pub embedding: EmbedConfig,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            context_dir: PathBuf::from("context"),
            fragments_path: PathBuf::from("cache/fragments.json"),
            vector_index_path: PathBuf::from("cache/vector_index.json"),
            prompt_path: PathBuf::from("prompt.txt"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: crate::retrieval::DEFAULT_TOP_K,
            mode: RetrievalMode::default(),
            metric: DistanceMetric::default(),
            embedding: EmbedConfig::default(),
        }
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

impl RagConfig {
    pub const DEFAULT_FILE: &'static str = "scout.toml";
    pub const ENV_PREFIX: &'static str = "SCOUT_";

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads `path`, or [`Self::DEFAULT_FILE`] if it exists when no path is given.
    ///
    /// An explicitly named file must exist.
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(Self::DEFAULT_FILE), false),
        };

        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                tracing::debug!("Loaded configuration from {}", path.display());
                Self::from_toml_str(&text)
            }
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No {} found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }

    /// Applies `SCOUT_*` overrides from `vars`; other keys are ignored.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(Self::ENV_PREFIX) else {
                continue;
            };
            match name {
                "CONTEXT_DIR" => self.context_dir = PathBuf::from(&value),
                "FRAGMENTS_PATH" => self.fragments_path = PathBuf::from(&value),
                "VECTOR_INDEX_PATH" => self.vector_index_path = PathBuf::from(&value),
                "PROMPT_PATH" => self.prompt_path = PathBuf::from(&value),
                "CHUNK_SIZE" => self.chunk_size = parse_value(&key, &value)?,
                "CHUNK_OVERLAP" => self.chunk_overlap = parse_value(&key, &value)?,
                "TOP_K" => self.top_k = parse_value(&key, &value)?,
                "MODE" => self.mode = parse_value(&key, &value)?,
                "METRIC" => {
                    self.metric = DistanceMetric::from_str(value.trim(), true).map_err(|_| {
                        ConfigError::InvalidValue {
                            key: key.clone(),
                            value: value.clone(),
                        }
                    })?
                }
                "EMBED_MODEL" => self.embedding.model_name = value.clone(),
                "EMBED_CACHE_DIR" => self.embedding.cache_dir = PathBuf::from(&value),
                _ => tracing::debug!("Ignoring unknown setting {}", key),
            }
        }
        Ok(())
    }

    /// Applies overrides from the process environment.
    pub fn apply_process_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env(std::env::vars())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunker()?;
        if self.top_k == 0 {
            return Err(ConfigError::Invalid("top_k must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn chunker(&self) -> Result<Chunker, ConfigError> {
        Ok(Chunker::new(self.chunk_size, self.chunk_overlap)?)
    }

    pub fn with_context_dir(mut self, context_dir: impl Into<PathBuf>) -> Self {
        self.context_dir = context_dir.into();
        self
    }

    /// Places both persisted files under `cache_dir`.
    pub fn with_cache_dir(mut self, cache_dir: impl AsRef<Path>) -> Self {
        self.fragments_path = cache_dir.as_ref().join("fragments.json");
        self.vector_index_path = cache_dir.as_ref().join("vector_index.json");
        self
    }

    pub fn with_chunking(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_overlap = chunk_overlap;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_mode(mut self, mode: RetrievalMode) -> Self {
        self.mode = mode;
        self
    }
}
