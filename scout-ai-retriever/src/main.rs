use clap::{Parser, Subcommand};
use scout_ai_retriever::{
    RetrievalError,
    config::{RagConfig, RetrievalMode},
    ingest::ChunkScope,
    pipeline,
    prompt::{ChatRequest, Conversation, PromptAssembler},
    retrieval::{Availability, RetrievedFragment},
    storage::persist,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process;

/// Ingest documents, build the vector index and query fragments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults to ./scout.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chunk the context folder and write the fragment file
    Ingest {
        /// Folder to read instead of the configured one
        #[arg(long)]
        context_dir: Option<PathBuf>,
        /// Chunk each file separately and keep its name on the fragments
        #[arg(long)]
        per_document: bool,
        /// Fragment length in characters
        #[arg(short = 's', long)]
        chunk_size: Option<usize>,
        /// Characters shared by consecutive fragments
        #[arg(long)]
        overlap: Option<usize>,
    },
    /// Embed the fragment file and write the vector index
    Embed,
    /// Print the fragments most relevant to a query
    Search {
        query: String,
        #[arg(short, long, value_enum)]
        mode: Option<RetrievalMode>,
        /// Maximum number of fragments
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// Print the chat-completion request a query would produce
    Prompt {
        query: String,
        #[arg(short, long, value_enum)]
        mode: Option<RetrievalMode>,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Chat model named in the request
        #[arg(long)]
        model: Option<String>,
    },
    /// Show what has been ingested and embedded
    Stats {
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    mode: &'static str,
    results: Vec<RetrievedFragment<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unavailable: Option<String>,
}

#[derive(Serialize)]
struct VectorIndexStats {
    model: String,
    metric: String,
    dimension: usize,
    vectors: usize,
}

#[derive(Serialize)]
struct Stats {
    fragments: Option<usize>,
    documents: Option<usize>,
    vector_index: Option<VectorIndexStats>,
    vector_index_error: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn provider_for(
    config: &RagConfig,
    mode: RetrievalMode,
) -> Availability<std::sync::Arc<dyn scout_ai_embed::EmbeddingProvider>> {
    match mode {
        RetrievalMode::Lexical => Availability::unavailable("lexical mode does not embed"),
        RetrievalMode::Vector => pipeline::load_provider(config).await,
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_writer(std::io::stderr)
        .init();

    let mut config = RagConfig::load(args.config.as_deref()).await?;
    config.apply_process_env()?;

    match args.command {
        Commands::Ingest {
            context_dir,
            per_document,
            chunk_size,
            overlap,
        } => {
            if let Some(dir) = context_dir {
                config.context_dir = dir;
            }
            config.chunk_size = chunk_size.unwrap_or(config.chunk_size);
            config.chunk_overlap = overlap.unwrap_or(config.chunk_overlap);
            config.validate()?;

            let scope = if per_document {
                ChunkScope::PerDocument
            } else {
                ChunkScope::Corpus
            };
            let report = pipeline::ingest(&config, scope).await?;
            println!(
                "Ingested {} documents ({} skipped) into {} fragments",
                report.documents, report.skipped, report.fragments
            );
            println!("Fragments written to {}", config.fragments_path.display());
            Ok(())
        }
        Commands::Embed => {
            config.validate()?;
            let provider = scout_ai_embed::FastEmbedProvider::create(config.embedding.clone())
                .await?;
            let report = pipeline::build_vector_index(&config, &provider).await?;
            println!(
                "Embedded {} fragments with {} (dimension {})",
                report.vectors, report.model, report.dimension
            );
            println!(
                "Vector index written to {}",
                config.vector_index_path.display()
            );
            Ok(())
        }
        Commands::Search {
            query,
            mode,
            top_k,
            format,
        } => {
            let mode = mode.unwrap_or(config.mode);
            config.top_k = top_k.unwrap_or(config.top_k);
            config.validate()?;

            let provider = provider_for(&config, mode).await;
            let retriever = pipeline::open_retriever(&config, mode, provider).await?;

            match format {
                OutputFormat::Text => {
                    println!("{}", retriever.relevant_context(&query).await?);
                }
                OutputFormat::Json => {
                    let (results, unavailable) = match retriever.retrieve(&query).await {
                        Ok(results) => (results, None),
                        Err(RetrievalError::Unavailable { reason }) => {
                            tracing::warn!("{} retrieval unavailable: {}", mode, reason);
                            (Vec::new(), Some(reason))
                        }
                        Err(e) => return Err(e.into()),
                    };
                    let output = SearchOutput {
                        query: &query,
                        mode: retriever.strategy_name(),
                        results,
                        unavailable,
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            }
            Ok(())
        }
        Commands::Prompt {
            query,
            mode,
            top_k,
            model,
        } => {
            let mode = mode.unwrap_or(config.mode);
            config.top_k = top_k.unwrap_or(config.top_k);
            config.validate()?;

            let provider = provider_for(&config, mode).await;
            let retriever = pipeline::open_retriever(&config, mode, provider).await?;
            let assembler = PromptAssembler::load_or_default(&config.prompt_path).await;

            let mut conversation = Conversation::new();
            let messages = conversation
                .prepare_turn(&query, &retriever, &assembler)
                .await?;
            let mut request = ChatRequest::new(messages);
            if let Some(model) = model {
                request = request.with_model(model);
            }
            println!("{}", serde_json::to_string_pretty(&request)?);
            Ok(())
        }
        Commands::Stats { format } => {
            let store = persist::load_fragments(&config.fragments_path).await.ok();
            let documents = store.as_ref().map(|s| {
                s.iter()
                    .filter_map(|f| f.document())
                    .collect::<std::collections::HashSet<_>>()
                    .len()
            });

            let (vector_index, vector_index_error) =
                match persist::load_vector_index(&config.vector_index_path).await {
                    Ok((_, index)) => (
                        Some(VectorIndexStats {
                            model: index.model().to_string(),
                            metric: index.metric().to_string(),
                            dimension: index.dimension(),
                            vectors: index.len(),
                        }),
                        None,
                    ),
                    Err(e) => (None, Some(e.to_string())),
                };

            let stats = Stats {
                fragments: store.as_ref().map(|s| s.len()),
                documents,
                vector_index,
                vector_index_error,
            };

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                }
                OutputFormat::Text => {
                    println!("Retrieval Statistics:");
                    match stats.fragments {
                        Some(count) => println!("  Fragments: {count}"),
                        None => println!(
                            "  Fragments: none ({} not found)",
                            config.fragments_path.display()
                        ),
                    }
                    if let Some(documents) = stats.documents.filter(|d| *d > 0) {
                        println!("  Tagged documents: {documents}");
                    }
                    match (&stats.vector_index, &stats.vector_index_error) {
                        (Some(index), _) => {
                            println!("  Vector index: {} vectors", index.vectors);
                            println!("    Model: {}", index.model);
                            println!("    Metric: {}", index.metric);
                            println!("    Dimension: {}", index.dimension);
                        }
                        (None, Some(error)) => println!("  Vector index: unavailable ({error})"),
                        (None, None) => println!("  Vector index: unavailable"),
                    }
                }
            }
            Ok(())
        }
    }
}
