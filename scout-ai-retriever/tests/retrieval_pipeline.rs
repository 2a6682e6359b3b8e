use anyhow::Result;
use async_trait::async_trait;
use half::f16;
use scout_ai_embed::{EmbeddingProvider, EmbeddingResult};
use scout_ai_retriever::{
    RagConfig, RetrievalError, RetrievalMode, UNAVAILABLE_PLACEHOLDER,
    ingest::ChunkScope,
    pipeline,
    prompt::{ChatBackend, ChatMessage, Conversation, PromptAssembler},
    retrieval::Availability,
    storage::persist,
};
use std::sync::Arc;
use tempfile::TempDir;

const DIMENSION: usize = 32;

/// Bag-of-words vectors: each lower-cased word bumps one bucket.
#[derive(Debug)]
struct HashingProvider;

fn bucket(word: &str) -> usize {
    word.bytes()
        .fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
        % DIMENSION
}

fn embed(text: &str) -> Vec<f16> {
    let mut counts = vec![0.0f32; DIMENSION];
    for word in text.split_whitespace() {
        let word: String = word
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        if !word.is_empty() {
            counts[bucket(&word)] += 1.0;
        }
    }
    counts.into_iter().map(f16::from_f32).collect()
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    async fn embed_text(&self, text: &str) -> scout_ai_embed::Result<Vec<f16>> {
        Ok(embed(text))
    }

    async fn embed_texts(&self, texts: &[String]) -> scout_ai_embed::Result<EmbeddingResult> {
        Ok(EmbeddingResult::new(texts.iter().map(|t| embed(t)).collect()))
    }

    fn embedding_dimension(&self) -> usize {
        DIMENSION
    }

    fn provider_name(&self) -> &str {
        "hashing"
    }
}

struct CannedBackend;

#[async_trait]
impl ChatBackend for CannedBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        Ok(format!("received {} messages", messages.len()))
    }
}

fn provider() -> Availability<Arc<dyn EmbeddingProvider>> {
    Availability::Ready(Arc::new(HashingProvider))
}

/// A context folder with three small documents, chunked per document.
async fn ingested(temp_dir: &TempDir) -> Result<RagConfig> {
    let context_dir = temp_dir.path().join("context");
    std::fs::create_dir(&context_dir)?;
    std::fs::write(
        context_dir.join("knots.txt"),
        "The bowline makes a fixed loop at the end of a rope.",
    )?;
    std::fs::write(
        context_dir.join("camp.md"),
        "Pitch the tents on high ground away from the river.",
    )?;
    std::fs::write(
        context_dir.join("budget.txt"),
        "The spring camp budget covers food and transport.",
    )?;

    let config = RagConfig::default()
        .with_context_dir(&context_dir)
        .with_cache_dir(temp_dir.path().join("cache"))
        .with_chunking(200, 20)
        .with_top_k(2);

    let report = pipeline::ingest(&config, ChunkScope::PerDocument).await?;
    assert_eq!(report.documents, 3);
    assert_eq!(report.fragments, 3);
    Ok(config)
}

#[tokio::test]
async fn test_lexical_end_to_end() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = ingested(&temp_dir).await?;

    let retriever = pipeline::open_retriever(&config, RetrievalMode::Lexical, provider()).await?;
    let hits = retriever.retrieve("camp tents").await?;

    assert_eq!(hits.len(), 2);
    // one shared word each; store order breaks the tie
    assert_eq!(hits[0].fragment.document(), Some("budget.txt"));
    assert_eq!(hits[1].fragment.document(), Some("camp.md"));

    assert_eq!(retriever.relevant_context("zebra").await?, "");
    Ok(())
}

#[tokio::test]
async fn test_vector_end_to_end() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = ingested(&temp_dir).await?;

    let report = pipeline::build_vector_index(&config, &HashingProvider).await?;
    assert_eq!(report.vectors, 3);
    assert_eq!(report.dimension, DIMENSION);

    let retriever = pipeline::open_retriever(&config, RetrievalMode::Vector, provider())
        .await?
        .with_top_k(1);
    let hits = retriever.retrieve("bowline loop rope").await?;

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].fragment.document(), Some("knots.txt"));
    Ok(())
}

#[tokio::test]
async fn test_vector_index_survives_reload() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = ingested(&temp_dir).await?;
    pipeline::build_vector_index(&config, &HashingProvider).await?;

    let (store, index) = persist::load_vector_index(&config.vector_index_path).await?;
    let fragments = persist::load_fragments(&config.fragments_path).await?;

    assert_eq!(store, fragments);
    assert_eq!(index.len(), store.len());
    assert_eq!(index.model(), "all-MiniLM-L6-v2");
    Ok(())
}

#[tokio::test]
async fn test_vector_without_index_file_degrades() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = ingested(&temp_dir).await?;

    let retriever = pipeline::open_retriever(&config, RetrievalMode::Vector, provider()).await?;
    assert_eq!(retriever.context().store().len(), 3);
    assert_eq!(
        retriever.relevant_context("bowline").await?,
        UNAVAILABLE_PLACEHOLDER
    );
    Ok(())
}

#[tokio::test]
async fn test_vector_without_provider_degrades() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = ingested(&temp_dir).await?;
    pipeline::build_vector_index(&config, &HashingProvider).await?;

    let retriever = pipeline::open_retriever(
        &config,
        RetrievalMode::Vector,
        Availability::unavailable("model download failed"),
    )
    .await?;
    assert_eq!(
        retriever.relevant_context("bowline").await?,
        UNAVAILABLE_PLACEHOLDER
    );
    Ok(())
}

#[tokio::test]
async fn test_misaligned_index_file_is_an_error() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = RagConfig::default().with_cache_dir(temp_dir.path());
    std::fs::write(
        &config.vector_index_path,
        r#"{"model":"hashing","metric":"cosine","dimension":2,
            "fragments":["one","two"],"embeddings":[[1.0,0.0]]}"#,
    )?;

    let err = pipeline::open_retriever(&config, RetrievalMode::Vector, provider())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RetrievalError>(),
        Some(RetrievalError::Misaligned {
            fragments: 2,
            embeddings: 1
        })
    ));
    Ok(())
}

#[tokio::test]
async fn test_conversation_over_ingested_context() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = ingested(&temp_dir).await?;
    let retriever = pipeline::open_retriever(&config, RetrievalMode::Lexical, provider()).await?;
    let assembler = PromptAssembler::new("You help plan scout programs.");

    let mut conversation = Conversation::new();
    let reply = conversation
        .ask("where do we pitch tents", &retriever, &assembler, &CannedBackend)
        .await?;
    assert_eq!(reply, "received 2 messages");

    let reply = conversation
        .ask("and the budget?", &retriever, &assembler, &CannedBackend)
        .await?;
    assert_eq!(reply, "received 4 messages");
    assert_eq!(conversation.history().len(), 4);
    Ok(())
}
