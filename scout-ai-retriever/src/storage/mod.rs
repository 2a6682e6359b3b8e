//! In-memory fragment storage and the parallel embedding index
//!
//! ## Key Components
//!
//! - **FragmentStore**: ordered, index-addressable sequence of [`Fragment`]s
//! - **EmbeddingIndex**: one vector per fragment, searched by brute-force
//!   nearest-neighbour with a fixed [`DistanceMetric`]
//! - **persist**: JSON load/save for both structures
//!
//! ## Alignment
//!
//! ```text
//! FragmentStore   [ f0 ][ f1 ][ f2 ] ...
//!                    |     |     |
//! EmbeddingIndex  [ v0 ][ v1 ][ v2 ] ...
//! ```
//!
//! A fragment's position is its only identifier. Both structures are built once
//! and never mutated, so an index returned by a search resolves to the same
//! fragment for the lifetime of the pair. Any length mismatch is reported as
//! [`RetrievalError::Misaligned`] instead of being papered over.

use crate::error::{Result, RetrievalError};
use half::f16;
use scout_ai_context::{Chunker, Fragment};
use scout_ai_embed::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub mod persist;

/// Position of a fragment in its [`FragmentStore`].
pub type FragmentIndex = usize;

/// Ordered sequence of fragments; position is the stable identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FragmentStore {
    fragments: Vec<Fragment>,
}

impl FragmentStore {
    pub fn new(fragments: Vec<Fragment>) -> Self {
        Self { fragments }
    }

    /// Chunks one text blob into a new store.
    pub fn from_text(chunker: &Chunker, text: &str) -> Self {
        Self::new(chunker.chunk(text))
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn get(&self, index: FragmentIndex) -> Option<&Fragment> {
        self.fragments.get(index)
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter()
    }

    /// Owned copies of every fragment's text, in store order.
    pub fn texts(&self) -> Vec<String> {
        self.fragments.iter().map(|f| f.text().to_string()).collect()
    }
}

/// Distance function an [`EmbeddingIndex`] is searched with.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Cosine similarity, larger is nearer
    #[default]
    Cosine,
    /// Euclidean (L2) distance, smaller is nearer
    Euclidean,
}

impl DistanceMetric {
    /// Score of `b` relative to `a` under this metric.
    pub fn score(&self, a: &[f16], b: &[f16]) -> f32 {
        match self {
            DistanceMetric::Cosine => cosine_similarity(a, b),
            DistanceMetric::Euclidean => euclidean_distance(a, b),
        }
    }

    /// Orders two scores so that the nearer one comes first. NaN sorts last.
    pub fn nearest_first(&self, a: f32, b: f32) -> Ordering {
        a.is_nan().cmp(&b.is_nan()).then_with(|| match self {
            DistanceMetric::Cosine => b.total_cmp(&a),
            DistanceMetric::Euclidean => a.total_cmp(&b),
        })
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistanceMetric::Cosine => write!(f, "cosine"),
            DistanceMetric::Euclidean => write!(f, "euclidean"),
        }
    }
}

fn cosine_similarity(a: &[f16], b: &[f16]) -> f32 {
    let mut dot_product = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        let (x, y) = (x.to_f32(), y.to_f32());
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot_product / (norm_a.sqrt() * norm_b.sqrt())
}

fn euclidean_distance(a: &[f16], b: &[f16]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x.to_f32() - y.to_f32();
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// One search hit: a fragment position and its metric score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: FragmentIndex,
    pub score: f32,
}

/// Fixed-dimension vectors aligned one-to-one with a [`FragmentStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingIndex {
    model: String,
    metric: DistanceMetric,
    dimension: usize,
    vectors: Vec<Vec<f16>>,
}

impl EmbeddingIndex {
    /// Wraps precomputed vectors, checking that they share one non-zero dimension
    /// and hold only finite values.
    pub fn new(
        model: impl Into<String>,
        metric: DistanceMetric,
        vectors: Vec<Vec<f16>>,
    ) -> Result<Self> {
        let dimension = vectors.first().map(|v| v.len()).unwrap_or(0);
        if !vectors.is_empty() && dimension == 0 {
            return Err(RetrievalError::invalid_index("vectors have zero dimension"));
        }
        if let Some(position) = vectors.iter().position(|v| v.len() != dimension) {
            return Err(RetrievalError::invalid_index(format!(
                "vector {position} has dimension {}, expected {dimension}",
                vectors[position].len()
            )));
        }
        if let Some(position) = vectors
            .iter()
            .position(|v| v.iter().any(|x| !x.is_finite()))
        {
            return Err(RetrievalError::invalid_index(format!(
                "vector {position} has non-finite components"
            )));
        }

        Ok(Self {
            model: model.into(),
            metric,
            dimension,
            vectors,
        })
    }

    /// Embeds every fragment of `store`, in order. A one-time batch step.
    pub async fn build(
        store: &FragmentStore,
        provider: &dyn EmbeddingProvider,
        model: impl Into<String>,
        metric: DistanceMetric,
    ) -> Result<Self> {
        tracing::info!(
            "Building {} embedding index for {} fragments with {}",
            metric,
            store.len(),
            provider.provider_name()
        );

        let result = provider.embed_texts(&store.texts()).await?;
        if result.len() != store.len() {
            return Err(RetrievalError::Misaligned {
                fragments: store.len(),
                embeddings: result.len(),
            });
        }

        let index = Self::new(model, metric, result.embeddings)?;
        tracing::info!("Embedding index built. Dimension: {}", index.dimension);
        Ok(index)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn vectors(&self) -> &[Vec<f16>] {
        &self.vectors
    }

    /// Fails with [`RetrievalError::Misaligned`] unless every fragment has exactly one vector.
    pub fn ensure_aligned(&self, store: &FragmentStore) -> Result<()> {
        if self.vectors.len() != store.len() {
            return Err(RetrievalError::Misaligned {
                fragments: store.len(),
                embeddings: self.vectors.len(),
            });
        }
        Ok(())
    }

    /// Returns up to `top_k` nearest vectors to `query`, nearest first.
    pub fn search(&self, query: &[f16], top_k: usize) -> Result<Vec<Neighbor>> {
        if !self.is_empty() && query.len() != self.dimension {
            return Err(RetrievalError::invalid_index(format!(
                "query has dimension {}, index has {}",
                query.len(),
                self.dimension
            )));
        }

        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(index, vector)| Neighbor {
                index,
                score: self.metric.score(query, vector),
            })
            .collect();

        neighbors.sort_by(|a, b| self.metric.nearest_first(a.score, b.score));
        neighbors.truncate(top_k);

        Ok(neighbors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(values: &[f32]) -> Vec<f16> {
        values.iter().copied().map(f16::from_f32).collect()
    }

    #[test]
    fn test_store_from_text_preserves_order() {
        let chunker = Chunker::new(4, 1).unwrap();
        let store = FragmentStore::from_text(&chunker, "ABCDEFGHIJ");

        assert_eq!(store.len(), 3);
        assert_eq!(store.get(1).map(|f| f.text()), Some("DEFG"));
        assert_eq!(store.get(3), None);
        assert_eq!(store.texts(), vec!["ABCD", "DEFG", "GHIJ"]);
    }

    #[test]
    fn test_index_rejects_mixed_dimensions() {
        let err = EmbeddingIndex::new(
            "test",
            DistanceMetric::Cosine,
            vec![v(&[1.0, 0.0]), v(&[1.0, 0.0, 0.0])],
        )
        .unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidIndex { .. }));

        let err = EmbeddingIndex::new("test", DistanceMetric::Cosine, vec![vec![]]).unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidIndex { .. }));
    }

    #[test]
    fn test_ensure_aligned() {
        let store = FragmentStore::new(vec![
            Fragment::new("a", None, 0),
            Fragment::new("b", None, 1),
        ]);
        let index =
            EmbeddingIndex::new("test", DistanceMetric::Cosine, vec![v(&[1.0, 0.0])]).unwrap();

        assert!(matches!(
            index.ensure_aligned(&store),
            Err(RetrievalError::Misaligned {
                fragments: 2,
                embeddings: 1
            })
        ));
    }

    #[test]
    fn test_cosine_search_orders_by_similarity() {
        let index = EmbeddingIndex::new(
            "test",
            DistanceMetric::Cosine,
            vec![v(&[0.0, 1.0]), v(&[1.0, 0.0]), v(&[0.7, 0.7])],
        )
        .unwrap();

        let hits = index.search(&v(&[1.0, 0.1]), 2).unwrap();
        let order: Vec<usize> = hits.iter().map(|n| n.index).collect();
        assert_eq!(order, vec![1, 2]);
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_euclidean_search_orders_by_distance() {
        let index = EmbeddingIndex::new(
            "test",
            DistanceMetric::Euclidean,
            vec![v(&[5.0, 5.0]), v(&[1.0, 1.0]), v(&[0.0, 0.0])],
        )
        .unwrap();

        let hits = index.search(&v(&[0.9, 1.2]), 3).unwrap();
        let order: Vec<usize> = hits.iter().map(|n| n.index).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert!(hits[0].score < hits[1].score);
    }

    #[test]
    fn test_search_rejects_wrong_query_dimension() {
        let index =
            EmbeddingIndex::new("test", DistanceMetric::Cosine, vec![v(&[1.0, 0.0])]).unwrap();
        assert!(matches!(
            index.search(&v(&[1.0, 0.0, 0.0]), 1),
            Err(RetrievalError::InvalidIndex { .. })
        ));
    }

    #[test]
    fn test_index_rejects_non_finite_values() {
        let err = EmbeddingIndex::new(
            "test",
            DistanceMetric::Cosine,
            vec![v(&[1.0, 0.0]), vec![f16::INFINITY, f16::ZERO]],
        )
        .unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidIndex { .. }));

        let err = EmbeddingIndex::new("test", DistanceMetric::Euclidean, vec![vec![f16::NAN]])
            .unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidIndex { .. }));
    }

    #[test]
    fn test_nearest_first_is_total_with_nan() {
        let mut scores: Vec<f32> = (0..64)
            .map(|i| if i % 3 == 0 { f32::NAN } else { i as f32 })
            .collect();

        scores.sort_by(|a, b| DistanceMetric::Cosine.nearest_first(*a, *b));
        assert_eq!(scores[0], 62.0);
        assert!(scores[42..].iter().all(|s| s.is_nan()));

        scores.sort_by(|a, b| DistanceMetric::Euclidean.nearest_first(*a, *b));
        assert_eq!(scores[0], 1.0);
        assert!(scores[42..].iter().all(|s| s.is_nan()));
    }

    #[test]
    fn test_search_top_k_larger_than_index() {
        let index =
            EmbeddingIndex::new("test", DistanceMetric::Cosine, vec![v(&[1.0, 0.0])]).unwrap();
        assert_eq!(index.search(&v(&[1.0, 0.0]), 10).unwrap().len(), 1);
    }
}
