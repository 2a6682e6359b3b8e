//! Ingests a small context folder and answers a few queries lexically
//!
//! Run with: cargo run -p scout-ai-retriever --example lexical_search

use anyhow::Result;
use scout_ai_retriever::{
    RagConfig, RetrievalMode, ingest::ChunkScope, pipeline, prompt::PromptAssembler,
    retrieval::Availability,
};
use tempfile::tempdir;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let temp_dir = tempdir()?;
    let context_dir = temp_dir.path().join("context");
    std::fs::create_dir(&context_dir)?;

    let documents = [
        (
            "knots.md",
            "The bowline makes a fixed loop at the end of a rope. \
             The clove hitch binds a rope to a pole.",
        ),
        (
            "camp.md",
            "Pitch the tents on high ground away from the river. \
             Keep the fire downwind of the tents.",
        ),
        (
            "budget.txt",
            "The spring camp budget covers food, transport and first aid supplies.",
        ),
    ];
    for (name, text) in documents {
        std::fs::write(context_dir.join(name), text)?;
    }

    let config = RagConfig::default()
        .with_context_dir(&context_dir)
        .with_cache_dir(temp_dir.path().join("cache"))
        .with_chunking(80, 20)
        .with_top_k(2);

    let report = pipeline::ingest(&config, ChunkScope::PerDocument).await?;
    println!(
        "Ingested {} documents into {} fragments\n",
        report.documents, report.fragments
    );

    let retriever = pipeline::open_retriever(
        &config,
        RetrievalMode::Lexical,
        Availability::unavailable("lexical only"),
    )
    .await?;

    for query in ["rope loop", "where are the tents", "budget for food"] {
        println!("Query: {query}");
        for hit in retriever.retrieve(query).await? {
            println!(
                "  [{:.0}] {}: {}",
                hit.score,
                hit.fragment.document().unwrap_or("-"),
                hit.text()
            );
        }
        println!();
    }

    let context = retriever.relevant_context("tents fire").await?;
    let system = PromptAssembler::default().system_message(&context);
    println!("System message:\n{}", system.content);

    Ok(())
}
