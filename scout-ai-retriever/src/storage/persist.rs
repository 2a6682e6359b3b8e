//! JSON persistence for fragment stores and embedding indexes
//!
//! Two files are accepted:
//!
//! - `fragments.json`: an array of fragment texts. Fragments that carry a
//!   document name are written as `{"text", "document", "ordinal"}` objects
//!   instead; both forms load.
//! - `vector_index.json`: `{model, metric, dimension, fragments, embeddings}`
//!   with the embeddings stored as `f32` arrays, one per fragment.

use super::{DistanceMetric, EmbeddingIndex, FragmentStore};
use crate::error::{Result, RetrievalError};
use chrono::{DateTime, Utc};
use half::f16;
use scout_ai_context::Fragment;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredFragment {
    Text(String),
    Full(Fragment),
}

impl StoredFragment {
    fn from_fragment(fragment: &Fragment) -> Self {
        match fragment.document() {
            Some(_) => Self::Full(fragment.clone()),
            None => Self::Text(fragment.text().to_string()),
        }
    }

    fn into_fragment(self, position: usize) -> Fragment {
        match self {
            Self::Text(text) => Fragment::new(text, None, position),
            Self::Full(fragment) => fragment,
        }
    }
}

fn to_stored(store: &FragmentStore) -> Vec<StoredFragment> {
    store.iter().map(StoredFragment::from_fragment).collect()
}

fn from_stored(stored: Vec<StoredFragment>) -> FragmentStore {
    FragmentStore::new(
        stored
            .into_iter()
            .enumerate()
            .map(|(position, s)| s.into_fragment(position))
            .collect(),
    )
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredVectorIndex {
    model: String,
    #[serde(default)]
    metric: DistanceMetric,
    dimension: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    fragments: Vec<StoredFragment>,
    embeddings: Vec<Vec<f32>>,
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| RetrievalError::io(parent, e))?;
    }
    let json = serde_json::to_vec_pretty(value).map_err(|e| RetrievalError::json(path, e))?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| RetrievalError::io(path, e))
}

async fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| RetrievalError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| RetrievalError::json(path, e))
}

/// Writes `store` as a fragment array, creating parent directories.
pub async fn save_fragments(path: &Path, store: &FragmentStore) -> Result<()> {
    write_json(path, &to_stored(store)).await?;
    tracing::info!("Saved {} fragments to {}", store.len(), path.display());
    Ok(())
}

pub async fn load_fragments(path: &Path) -> Result<FragmentStore> {
    let stored: Vec<StoredFragment> = read_json(path).await?;
    let store = from_stored(stored);
    tracing::debug!("Loaded {} fragments from {}", store.len(), path.display());
    Ok(store)
}

/// Writes the store together with its aligned index.
pub async fn save_vector_index(
    path: &Path,
    store: &FragmentStore,
    index: &EmbeddingIndex,
) -> Result<()> {
    index.ensure_aligned(store)?;

    let stored = StoredVectorIndex {
        model: index.model().to_string(),
        metric: index.metric(),
        dimension: index.dimension(),
        created_at: Some(Utc::now()),
        fragments: to_stored(store),
        embeddings: index
            .vectors()
            .iter()
            .map(|v| v.iter().map(|x| x.to_f32()).collect())
            .collect(),
    };
    write_json(path, &stored).await?;

    tracing::info!(
        "Saved {} vectors of dimension {} to {}",
        index.len(),
        index.dimension(),
        path.display()
    );
    Ok(())
}

/// Loads a store and its index, failing fast when they disagree.
pub async fn load_vector_index(path: &Path) -> Result<(FragmentStore, EmbeddingIndex)> {
    let stored: StoredVectorIndex = read_json(path).await?;

    if stored.fragments.len() != stored.embeddings.len() {
        return Err(RetrievalError::Misaligned {
            fragments: stored.fragments.len(),
            embeddings: stored.embeddings.len(),
        });
    }
    if let Some(position) = stored
        .embeddings
        .iter()
        .position(|v| v.len() != stored.dimension)
    {
        return Err(RetrievalError::invalid_index(format!(
            "{}: embedding {position} has dimension {}, header says {}",
            path.display(),
            stored.embeddings[position].len(),
            stored.dimension
        )));
    }

    let limit = f16::MAX.to_f32();
    if let Some(position) = stored
        .embeddings
        .iter()
        .position(|v| v.iter().any(|x| !x.is_finite() || x.abs() > limit))
    {
        return Err(RetrievalError::invalid_index(format!(
            "{}: embedding {position} has components outside the half-precision range",
            path.display()
        )));
    }

    let vectors = stored
        .embeddings
        .into_iter()
        .map(|v| v.into_iter().map(f16::from_f32).collect())
        .collect();
    let index = EmbeddingIndex::new(stored.model, stored.metric, vectors)?;
    let store = from_stored(stored.fragments);

    tracing::debug!(
        "Loaded vector index from {} ({} vectors, model {})",
        path.display(),
        index.len(),
        index.model()
    );
    Ok((store, index))
}
