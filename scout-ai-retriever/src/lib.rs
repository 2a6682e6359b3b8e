//! scout-ai-retriever: fragment retrieval for retrieval-augmented chat
//!
//! Turns a folder of documents into overlapping text fragments, ranks them
//! against a user query, and places the best ones in the system message of a
//! chat-completion request.
//!
//! ## Key Modules
//!
//! - **[`ingest`]**: reads the context folder into a corpus
//! - **[`storage`]**: fragment store, embedding index and their JSON files
//! - **[`retrieval`]**: lexical and vector scoring behind one [`retrieval::Retriever`]
//! - **[`prompt`]**: system message assembly and chat history
//! - **[`pipeline`]**: the batch steps and retriever construction from a [`config::RagConfig`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scout_ai_retriever::config::{RagConfig, RetrievalMode};
//! use scout_ai_retriever::ingest::ChunkScope;
//! use scout_ai_retriever::pipeline;
//! use scout_ai_retriever::retrieval::Availability;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = RagConfig::load(None).await?;
//! pipeline::ingest(&config, ChunkScope::Corpus).await?;
//!
//! let retriever =
//!     pipeline::open_retriever(&config, RetrievalMode::Lexical, Availability::unavailable("unused"))
//!         .await?;
//! let context = retriever.relevant_context("how do I tie a bowline").await?;
//! println!("{context}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! context/ → ingest → Chunker → FragmentStore ──────────────┐
//!                                   ↓                       ↓
//!                           EmbeddingIndex (optional) → Retriever → PromptAssembler → ChatBackend
//! ```

pub mod config;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod prompt;
pub mod retrieval;
pub mod storage;

pub use config::{RagConfig, RetrievalMode};
pub use error::{Result, RetrievalError};
pub use retrieval::{
    Availability, CONTEXT_SEPARATOR, RetrievalContext, Retriever, UNAVAILABLE_PLACEHOLDER,
};
pub use storage::{DistanceMetric, EmbeddingIndex, FragmentStore};
