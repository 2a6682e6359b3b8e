//! Batch steps and retriever construction driven by a [`RagConfig`]
//!
//! ```text
//! context/ ──ingest──> fragments.json ──build_vector_index──> vector_index.json
//!                           │                                      │
//!                           └──────────── open_context ────────────┘
//!                                              │
//!                                          Retriever
//! ```
//!
//! Each step is run to completion before the next; retrieval only reads what
//! the batch steps wrote.

use crate::config::{RagConfig, RetrievalMode};
use crate::error::RetrievalError;
use crate::ingest::{self, ChunkScope};
use crate::retrieval::{Availability, RetrievalContext, Retriever};
use crate::storage::{EmbeddingIndex, FragmentStore, persist};
use anyhow::{Context, Result};
use scout_ai_embed::{EmbeddingProvider, FastEmbedProvider};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub documents: usize,
    pub skipped: usize,
    pub fragments: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedReport {
    pub model: String,
    pub vectors: usize,
    pub dimension: usize,
}

/// Reads the context folder, chunks it and writes the fragment file.
pub async fn ingest(config: &RagConfig, scope: ChunkScope) -> Result<IngestReport> {
    let chunker = config.chunker()?;
    let corpus = ingest::read_context_dir(&config.context_dir).await?;
    let store = ingest::build_store(&corpus, &chunker, scope);

    persist::save_fragments(&config.fragments_path, &store).await?;

    let report = IngestReport {
        documents: corpus.documents.len(),
        skipped: corpus.skipped.len(),
        fragments: store.len(),
    };
    info!(
        "Ingested {} documents into {} fragments ({} skipped)",
        report.documents, report.fragments, report.skipped
    );
    Ok(report)
}

/// Embeds the fragment file and writes the vector index file.
pub async fn build_vector_index(
    config: &RagConfig,
    provider: &dyn EmbeddingProvider,
) -> Result<EmbedReport> {
    let store = persist::load_fragments(&config.fragments_path)
        .await
        .context("No fragments to embed; run `ingest` first")?;

    let index = EmbeddingIndex::build(
        &store,
        provider,
        config.embedding.model_name.clone(),
        config.metric,
    )
    .await?;
    persist::save_vector_index(&config.vector_index_path, &store, &index).await?;

    Ok(EmbedReport {
        model: index.model().to_string(),
        vectors: index.len(),
        dimension: index.dimension(),
    })
}

/// Loads the configured embedding model, reporting failure as unavailability.
pub async fn load_provider(config: &RagConfig) -> Availability<Arc<dyn EmbeddingProvider>> {
    match FastEmbedProvider::create(config.embedding.clone()).await {
        Ok(provider) => Availability::Ready(Arc::new(provider)),
        Err(e) => {
            warn!(
                "Embedding model {} unavailable: {}",
                config.embedding.model_name, e
            );
            Availability::unavailable(format!("embedding model failed to load: {e}"))
        }
    }
}

/// Builds the retrieval context for `mode` from the persisted files.
///
/// Lexical mode needs the fragment file. Vector mode degrades to an
/// unavailable backend when the index file or the provider is missing, but a
/// misaligned or inconsistent index file is an error.
pub async fn open_context(
    config: &RagConfig,
    mode: RetrievalMode,
    provider: Availability<Arc<dyn EmbeddingProvider>>,
) -> Result<RetrievalContext> {
    match mode {
        RetrievalMode::Lexical => {
            let store = persist::load_fragments(&config.fragments_path)
                .await
                .context("No fragments found; run `ingest` first")?;
            Ok(RetrievalContext::new(store))
        }
        RetrievalMode::Vector => open_vector_context(config, provider).await,
    }
}

async fn open_vector_context(
    config: &RagConfig,
    provider: Availability<Arc<dyn EmbeddingProvider>>,
) -> Result<RetrievalContext> {
    let (store, index) = match persist::load_vector_index(&config.vector_index_path).await {
        Ok(loaded) => loaded,
        Err(e @ (RetrievalError::Misaligned { .. } | RetrievalError::InvalidIndex { .. })) => {
            return Err(e.into());
        }
        Err(e) => {
            warn!("Vector index unavailable: {}", e);
            let store = fallback_store(config).await;
            return Ok(RetrievalContext::new(store)
                .with_vector_unavailable(format!("vector index could not be loaded: {e}")));
        }
    };

    match provider {
        Availability::Ready(provider) => Ok(RetrievalContext::new(store)
            .with_vector_backend(Arc::new(index), provider)?),
        Availability::Unavailable { reason } => {
            Ok(RetrievalContext::new(store).with_vector_unavailable(reason))
        }
    }
}

/// The fragment file if it can be read, otherwise an empty store.
async fn fallback_store(config: &RagConfig) -> FragmentStore {
    match persist::load_fragments(&config.fragments_path).await {
        Ok(store) => store,
        Err(e) => {
            if !e.is_not_found() {
                warn!("Ignoring unreadable fragment file: {}", e);
            }
            FragmentStore::default()
        }
    }
}

/// A retriever for `mode` using the configured `top_k`.
pub async fn open_retriever(
    config: &RagConfig,
    mode: RetrievalMode,
    provider: Availability<Arc<dyn EmbeddingProvider>>,
) -> Result<Retriever> {
    let context = Arc::new(open_context(config, mode, provider).await?);
    let retriever = match mode {
        RetrievalMode::Lexical => Retriever::lexical(context),
        RetrievalMode::Vector => Retriever::vector(context),
    };
    Ok(retriever.with_top_k(config.top_k))
}
