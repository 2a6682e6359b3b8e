//! Top-K retrieval over a fragment store
//!
//! A [`Retriever`] pairs a [`RetrievalContext`] with one [`ScoringStrategy`]:
//!
//! - [`LexicalStrategy`]: counts distinct query words shared with each fragment
//! - [`VectorStrategy`]: embeds the query and searches the [`EmbeddingIndex`]
//!
//! Both return ranked [`ScoredFragment`]s; the retriever maps them back through
//! the store and, for prompt assembly, joins the texts with [`CONTEXT_SEPARATOR`].
//!
//! [`EmbeddingIndex`]: crate::storage::EmbeddingIndex
//!
//! ## Degradation
//!
//! When the vector backend is missing, [`Retriever::relevant_context`] returns
//! [`UNAVAILABLE_PLACEHOLDER`] and logs a warning instead of failing.
//! A store and index of different lengths is still an error.
//!
//! ```
//! use scout_ai_context::Fragment;
//! use scout_ai_retriever::retrieval::{RetrievalContext, Retriever};
//! use scout_ai_retriever::storage::FragmentStore;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> scout_ai_retriever::error::Result<()> {
//! let store = FragmentStore::new(vec![
//!     Fragment::new("the cat sat", None, 0),
//!     Fragment::new("a dog ran", None, 1),
//!     Fragment::new("the cat ran", None, 2),
//! ]);
//! let context = Arc::new(RetrievalContext::new(store));
//! let retriever = Retriever::lexical(context).with_top_k(2);
//!
//! let joined = retriever.relevant_context("cat ran").await?;
//! assert_eq!(joined, "the cat ran\n---\nthe cat sat");
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, RetrievalError};
use crate::storage::FragmentIndex;
use async_trait::async_trait;
use itertools::Itertools;
use scout_ai_context::Fragment;
use serde::Serialize;
use std::sync::Arc;

pub mod context;
pub mod lexical;
pub mod vector;

pub use context::{Availability, RetrievalContext, VectorBackend};
pub use lexical::LexicalStrategy;
pub use vector::VectorStrategy;

/// Line placed between fragments in the joined context string.
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Returned in place of context when the vector backend cannot answer.
pub const UNAVAILABLE_PLACEHOLDER: &str = "The context search system is not available.";

pub const DEFAULT_TOP_K: usize = 5;

/// A fragment position and the score a strategy gave it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredFragment {
    pub index: FragmentIndex,
    pub score: f32,
}

/// Ranks the fragments of a [`RetrievalContext`] against a query.
///
/// Implementations return at most `top_k` entries, best first, and only
/// indexes that are valid in `context.store()`.
#[async_trait]
pub trait ScoringStrategy: Send + Sync + std::fmt::Debug {
    async fn rank(
        &self,
        query: &str,
        context: &RetrievalContext,
        top_k: usize,
    ) -> Result<Vec<ScoredFragment>>;

    fn name(&self) -> &'static str;
}

/// A ranked fragment borrowed from the store.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RetrievedFragment<'a> {
    pub index: FragmentIndex,
    pub score: f32,
    pub fragment: &'a Fragment,
}

impl RetrievedFragment<'_> {
    pub fn text(&self) -> &str {
        self.fragment.text()
    }
}

#[derive(Debug)]
pub struct Retriever {
    context: Arc<RetrievalContext>,
    strategy: Box<dyn ScoringStrategy>,
    top_k: usize,
}

impl Retriever {
    pub fn new(context: Arc<RetrievalContext>, strategy: Box<dyn ScoringStrategy>) -> Self {
        Self {
            context,
            strategy,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn lexical(context: Arc<RetrievalContext>) -> Self {
        Self::new(context, Box::new(LexicalStrategy))
    }

    pub fn vector(context: Arc<RetrievalContext>) -> Self {
        Self::new(context, Box::new(VectorStrategy)).with_top_k(vector::DEFAULT_VECTOR_TOP_K)
    }

    /// Sets the number of fragments returned. Zero is raised to one.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn context(&self) -> &RetrievalContext {
        &self.context
    }

    /// Ranked fragments for `query`, best first, at most [`Self::top_k`].
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedFragment<'_>>> {
        let ranked = self.strategy.rank(query, &self.context, self.top_k).await?;
        let store = self.context.store();

        ranked
            .into_iter()
            .map(|scored| {
                let fragment = store.get(scored.index).ok_or_else(|| {
                    RetrievalError::invalid_index(format!(
                        "{} strategy returned fragment {} but the store holds {}",
                        self.strategy.name(),
                        scored.index,
                        store.len()
                    ))
                })?;
                Ok(RetrievedFragment {
                    index: scored.index,
                    score: scored.score,
                    fragment,
                })
            })
            .collect()
    }

    /// The ranked fragment texts joined with [`CONTEXT_SEPARATOR`].
    ///
    /// Empty when nothing matches. [`UNAVAILABLE_PLACEHOLDER`] when the
    /// strategy's collaborators are missing.
    pub async fn relevant_context(&self, query: &str) -> Result<String> {
        match self.retrieve(query).await {
            Ok(fragments) => Ok(fragments.iter().map(|f| f.text()).join(CONTEXT_SEPARATOR)),
            Err(RetrievalError::Unavailable { reason }) => {
                tracing::warn!(
                    "{} retrieval unavailable, using placeholder: {}",
                    self.strategy.name(),
                    reason
                );
                Ok(UNAVAILABLE_PLACEHOLDER.to_string())
            }
            Err(e) => Err(e),
        }
    }
}
