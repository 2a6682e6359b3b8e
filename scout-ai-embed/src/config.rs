//! Configuration for embedding models

use crate::error::{EmbedError, Result};
use fastembed::EmbeddingModel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Model used when no name is configured. Small, multilingual-friendly, 384 dimensions.
pub const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Names accepted in [`EmbedConfig::model_name`] and the fastembed model each selects.
const KNOWN_MODELS: &[(&str, EmbeddingModel, usize)] = &[
    ("all-MiniLM-L6-v2", EmbeddingModel::AllMiniLML6V2, 384),
    ("all-MiniLM-L6-v2-q", EmbeddingModel::AllMiniLML6V2Q, 384),
    ("bge-small-en-v1.5", EmbeddingModel::BGESmallENV15, 384),
    (
        "paraphrase-multilingual-MiniLM-L12-v2",
        EmbeddingModel::ParaphraseMLMiniLML12V2,
        384,
    ),
    ("multilingual-e5-small", EmbeddingModel::MultilingualE5Small, 384),
];

/// Configuration for embedding models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Name of the embedding model to use
    pub model_name: String,
    /// Directory where fastembed caches downloaded model files
    pub cache_dir: PathBuf,
    /// Maximum batch size for embedding generation
    pub batch_size: usize,
    /// Whether to scale embeddings to unit length
    pub normalize: bool,
    /// Whether to print download progress on first use
    pub show_download_progress: bool,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            cache_dir: PathBuf::from(".fastembed_cache"),
            batch_size: 32,
            normalize: true,
            show_download_progress: true,
        }
    }
}

impl EmbedConfig {
    /// Create a configuration for the named model with default settings.
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    /// Create a default configuration caching models under the given path.
    pub fn default_with_path<P: AsRef<Path>>(cache_dir: P) -> Self {
        Self::default().with_cache_dir(cache_dir)
    }

    /// Set the model cache directory (builder style)
    pub fn with_cache_dir<P: AsRef<Path>>(self, cache_dir: P) -> Self {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
            ..self
        }
    }

    /// Set the batch size for embedding generation (builder style)
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    /// Set whether to normalize embeddings (builder style)
    pub fn with_normalize(self, normalize: bool) -> Self {
        Self { normalize, ..self }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Resolve the configured name to a fastembed model.
    pub fn fastembed_model(&self) -> Result<EmbeddingModel> {
        KNOWN_MODELS
            .iter()
            .find(|(name, _, _)| name.eq_ignore_ascii_case(&self.model_name))
            .map(|(_, model, _)| model.clone())
            .ok_or_else(|| {
                EmbedError::invalid_config(format!(
                    "Unknown embedding model '{}'. Known models: {}",
                    self.model_name,
                    known_model_names().join(", ")
                ))
            })
    }

    /// Dimension the configured model is documented to produce, if known.
    pub fn expected_dimension(&self) -> Option<usize> {
        KNOWN_MODELS
            .iter()
            .find(|(name, _, _)| name.eq_ignore_ascii_case(&self.model_name))
            .map(|(_, _, dimension)| *dimension)
    }

    /// Validate the configuration without loading the model.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EmbedError::invalid_config("batch_size must be positive"));
        }
        self.fastembed_model()?;

        tracing::debug!("Embedding config validation successful for: {}", self.model_name);
        Ok(())
    }
}

/// Names of every model [`EmbedConfig`] understands.
pub fn known_model_names() -> Vec<&'static str> {
    KNOWN_MODELS.iter().map(|(name, _, _)| *name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_defaults() {
        let config = EmbedConfig::default();

        assert_eq!(config.model_name(), DEFAULT_MODEL_NAME);
        assert_eq!(config.batch_size, 32);
        assert!(config.normalize);
        assert_eq!(config.expected_dimension(), Some(384));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder_methods() {
        let temp_dir = tempdir().unwrap();
        let config = EmbedConfig::default_with_path(temp_dir.path())
            .with_batch_size(64)
            .with_normalize(false);

        assert_eq!(config.cache_dir, temp_dir.path());
        assert_eq!(config.batch_size, 64);
        assert!(!config.normalize);
    }

    #[test]
    fn test_model_name_lookup_is_case_insensitive() {
        let config = EmbedConfig::new("BGE-Small-EN-v1.5");
        assert!(config.fastembed_model().is_ok());
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let unknown = EmbedConfig::new("not-a-model");
        let err = unknown.validate().unwrap_err();
        assert!(err.to_string().contains("not-a-model"));
        assert_eq!(unknown.expected_dimension(), None);

        let zero_batch = EmbedConfig::default().with_batch_size(0);
        assert!(matches!(
            zero_batch.validate(),
            Err(EmbedError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: EmbedConfig =
            serde_json::from_str(r#"{"model_name": "multilingual-e5-small"}"#).unwrap();

        assert_eq!(config.model_name, "multilingual-e5-small");
        assert_eq!(config.batch_size, 32);
        assert!(config.normalize);
    }
}
