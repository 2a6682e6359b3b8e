use clap::Parser;
use scout_ai_context::text::{Chunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use std::fs;
use std::io::{self, Read};

/// A CLI tool to split a text file into overlapping fragments, printed as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input text file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Document identifier attached to every fragment.
    #[arg(short, long)]
    document: Option<String>,

    /// Fragment length in characters.
    #[arg(short = 's', long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Characters shared by adjacent fragments.
    #[arg(short, long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
    overlap: usize,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let chunker = Chunker::new(args.chunk_size, args.overlap)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let content = if let Some(input_path) = args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let fragments = chunker.chunk_document(&content, args.document.as_deref());

    let json_output = serde_json::to_string_pretty(&fragments)?;
    println!("{json_output}");

    Ok(())
}
