//! Explicitly constructed retrieval state

use crate::error::{Result, RetrievalError};
use crate::storage::{EmbeddingIndex, FragmentStore};
use scout_ai_embed::EmbeddingProvider;
use std::sync::Arc;

/// Whether an optional collaborator can be used, and why not if it can't.
#[derive(Debug, Clone)]
pub enum Availability<T> {
    Ready(T),
    Unavailable { reason: String },
}

impl<T> Availability<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn as_ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Unavailable { .. } => None,
        }
    }

    /// The value, or [`RetrievalError::Unavailable`] carrying the reason.
    pub fn ready(&self) -> Result<&T> {
        match self {
            Self::Ready(value) => Ok(value),
            Self::Unavailable { reason } => Err(RetrievalError::unavailable(reason.clone())),
        }
    }
}

/// Embedding index plus the provider that embeds queries for it.
#[derive(Clone)]
pub struct VectorBackend {
    index: Arc<EmbeddingIndex>,
    provider: Arc<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for VectorBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorBackend")
            .field("model", &self.index.model())
            .field("metric", &self.index.metric())
            .field("vectors", &self.index.len())
            .field("provider", &self.provider.provider_name())
            .finish()
    }
}

impl VectorBackend {
    pub fn index(&self) -> &EmbeddingIndex {
        &self.index
    }

    pub fn provider(&self) -> &dyn EmbeddingProvider {
        self.provider.as_ref()
    }
}

/// Everything a [`crate::retrieval::Retriever`] reads. Immutable once built.
#[derive(Debug, Clone)]
pub struct RetrievalContext {
    store: Arc<FragmentStore>,
    vector: Availability<VectorBackend>,
}

impl RetrievalContext {
    /// A context with only a fragment store; vector retrieval reports unavailable.
    pub fn new(store: FragmentStore) -> Self {
        Self::from_shared(Arc::new(store))
    }

    pub fn from_shared(store: Arc<FragmentStore>) -> Self {
        Self {
            store,
            vector: Availability::unavailable("no embedding index loaded"),
        }
    }

    /// Attaches an index and query provider.
    ///
    /// Fails with [`RetrievalError::Misaligned`] if the index does not have one
    /// vector per fragment, and with [`RetrievalError::InvalidIndex`] if the
    /// provider's dimension differs from the index's.
    pub fn with_vector_backend(
        mut self,
        index: Arc<EmbeddingIndex>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        index.ensure_aligned(&self.store)?;
        if !index.is_empty() && provider.embedding_dimension() != index.dimension() {
            return Err(RetrievalError::invalid_index(format!(
                "provider {} produces dimension {}, index {} has {}",
                provider.provider_name(),
                provider.embedding_dimension(),
                index.model(),
                index.dimension()
            )));
        }

        self.vector = Availability::Ready(VectorBackend { index, provider });
        Ok(self)
    }

    pub fn with_vector_unavailable(mut self, reason: impl Into<String>) -> Self {
        self.vector = Availability::unavailable(reason);
        self
    }

    pub fn store(&self) -> &FragmentStore {
        &self.store
    }

    pub fn vector(&self) -> &Availability<VectorBackend> {
        &self.vector
    }
}
