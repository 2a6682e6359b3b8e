//! Embeds a few sentences with the default MiniLM model and prints their similarities

use scout_ai_embed::{EmbedConfig, EmbeddingProvider, FastEmbedProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let temp_dir = tempfile::tempdir()?;
    let config = EmbedConfig::default_with_path(temp_dir.path()).with_batch_size(2);

    println!("Model: {}", config.model_name());
    println!("Batch size: {}", config.batch_size);

    let provider = FastEmbedProvider::create(config).await?;
    println!("Dimension: {}", provider.embedding_dimension());

    let texts = vec![
        "The patrol sets up camp before sunset.".to_string(),
        "Tents are pitched in the evening.".to_string(),
        "Quarterly budget for the troop.".to_string(),
    ];
    let result = provider.embed_texts(&texts).await?;

    // Vectors are unit length, so the dot product is the cosine similarity.
    for (i, a) in result.embeddings.iter().enumerate() {
        for (j, b) in result.embeddings.iter().enumerate().skip(i + 1) {
            let similarity: f32 = a.iter().zip(b).map(|(x, y)| x.to_f32() * y.to_f32()).sum();
            println!("{:.3}  \"{}\" <-> \"{}\"", similarity, texts[i], texts[j]);
        }
    }

    Ok(())
}
