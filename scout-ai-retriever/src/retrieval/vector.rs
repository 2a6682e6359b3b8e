//! Nearest-neighbour scoring over a precomputed embedding index

use super::{RetrievalContext, ScoredFragment, ScoringStrategy};
use crate::error::{Result, RetrievalError};
use async_trait::async_trait;

pub const DEFAULT_VECTOR_TOP_K: usize = 3;

/// Embeds the query and returns the index's nearest fragments.
///
/// Reports [`RetrievalError::Unavailable`] when there is no backend, the store
/// is empty, or the query cannot be embedded.
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorStrategy;

#[async_trait]
impl ScoringStrategy for VectorStrategy {
    async fn rank(
        &self,
        query: &str,
        context: &RetrievalContext,
        top_k: usize,
    ) -> Result<Vec<ScoredFragment>> {
        if query.trim().is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let backend = context.vector().ready()?;
        if context.store().is_empty() {
            return Err(RetrievalError::unavailable("fragment store is empty"));
        }
        backend.index().ensure_aligned(context.store())?;

        let query_vector = backend.provider().embed_text(query).await.map_err(|e| {
            RetrievalError::unavailable(format!(
                "{} could not embed the query: {e}",
                backend.provider().provider_name()
            ))
        })?;

        let neighbors = backend.index().search(&query_vector, top_k)?;
        tracing::debug!(
            "Vector search ({}) returned {} neighbours",
            backend.index().metric(),
            neighbors.len()
        );

        Ok(neighbors
            .into_iter()
            .map(|n| ScoredFragment {
                index: n.index,
                score: n.score,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "vector"
    }
}
