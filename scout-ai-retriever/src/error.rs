//! Error types for fragment storage and retrieval

use scout_ai_embed::EmbedError;
use std::path::PathBuf;

/// Result type for storage and retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors raised by the fragment store, the embedding index and the retrievers.
///
/// Two variants matter to callers deciding whether to keep a conversation going:
/// - [`RetrievalError::Unavailable`] means a collaborator (index, embedding
///   model) is missing. [`crate::retrieval::Retriever::relevant_context`]
///   converts it into a placeholder string.
/// - [`RetrievalError::Misaligned`] means the fragment store and the embedding
///   index disagree on length. Results would map to the wrong fragments, so it
///   is always propagated.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// A collaborator needed by the strategy is missing or failed
    #[error("Retrieval unavailable: {reason}")]
    Unavailable { reason: String },

    /// Fragment store and embedding index lengths differ
    #[error(
        "Fragment store holds {fragments} fragments but the embedding index holds {embeddings} vectors"
    )]
    Misaligned { fragments: usize, embeddings: usize },

    /// The embedding index is internally inconsistent or incompatible with a query
    #[error("Invalid embedding index: {message}")]
    InvalidIndex { message: String },

    /// Embedding generation failed while building an index
    #[error("Embedding failed: {source}")]
    Embedding {
        #[from]
        source: EmbedError,
    },

    /// IO errors when reading or writing persisted stores
    #[error("IO error for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed persisted store
    #[error("Malformed JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl RetrievalError {
    pub fn unavailable<S: Into<String>>(reason: S) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn invalid_index<S: Into<String>>(message: S) -> Self {
        Self::InvalidIndex {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    /// Whether this error should degrade to the "unavailable" placeholder.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Whether this error means a persisted file simply does not exist yet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(RetrievalError::unavailable("no index").is_unavailable());
        assert!(
            !RetrievalError::Misaligned {
                fragments: 3,
                embeddings: 2
            }
            .is_unavailable()
        );

        let missing = RetrievalError::io(
            "cache/fragments.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(missing.is_not_found());
        assert!(missing.to_string().contains("cache/fragments.json"));
    }

    #[test]
    fn test_misaligned_message_names_both_lengths() {
        let err = RetrievalError::Misaligned {
            fragments: 10,
            embeddings: 9,
        };
        let message = err.to_string();
        assert!(message.contains("10 fragments"));
        assert!(message.contains("9 vectors"));
    }
}
