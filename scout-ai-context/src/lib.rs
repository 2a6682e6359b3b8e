pub mod text;

// Re-export the chunker for external use
pub use text::{ChunkError, Chunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, Fragment};
