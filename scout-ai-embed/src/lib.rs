//! # scout-ai-embed
//!
//! Text embeddings for the scout-ai retrieval pipeline, generated locally with
//! ONNX models via FastEmbed.
//!
//! ## Quick Start
//!
//! ```no_run
//! use scout_ai_embed::{EmbedConfig, EmbeddingProvider, FastEmbedProvider};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let provider = FastEmbedProvider::create(EmbedConfig::default()).await?;
//!
//! let texts = vec!["Hello world".to_string(), "How are you?".to_string()];
//! let result = provider.embed_texts(&texts).await?;
//!
//! println!("Generated {} embeddings of dimension {}",
//!          result.len(), result.dimension);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`config`]: model selection and batching options
//! - [`provider`]: the [`EmbeddingProvider`] trait and the FastEmbed implementation
//! - [`error`]: error types and result handling
//!
//! Vectors are returned as half-precision (`f16`) and, unless disabled in
//! [`EmbedConfig`], scaled to unit length so cosine similarity and Euclidean
//! distance rank neighbours identically.

pub mod config;
pub mod error;
pub mod provider;

// Re-export main types for easy access
pub use config::{DEFAULT_MODEL_NAME, EmbedConfig, known_model_names};
pub use error::{EmbedError, Result};
pub use provider::{EmbeddingProvider, EmbeddingResult, FastEmbedProvider};
