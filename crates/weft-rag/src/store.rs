//! Vector stores.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::Metadata;
use crate::embed::Embedding;
use crate::error::RagError;

/// A stored vector matched by [`VectorStore::query`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
  pub id: String,
  /// Cosine similarity to the query vector.
  pub score: f32,
  pub metadata: Metadata,
}

/// Named indexes of fixed-dimension vectors.
#[async_trait]
pub trait VectorStore: Send + Sync {
  /// Create an empty index. Fails if it already exists.
  async fn create_index(&self, name: &str, dimension: usize) -> Result<(), RagError>;

  /// Insert vectors with one metadata entry each. Returns the generated ids.
  async fn upsert(
    &self,
    index: &str,
    vectors: Vec<Embedding>,
    metadata: Vec<Metadata>,
  ) -> Result<Vec<String>, RagError>;

  /// The `top_k` closest vectors, best first.
  async fn query(
    &self,
    index: &str,
    vector: &[f32],
    top_k: usize,
  ) -> Result<Vec<QueryResult>, RagError>;
}

#[derive(Debug)]
struct Index {
  dimension: usize,
  entries: Vec<Entry>,
}

#[derive(Debug)]
struct Entry {
  id: String,
  vector: Embedding,
  metadata: Metadata,
}

/// In-process [`VectorStore`] with brute-force cosine search.
#[derive(Debug, Default)]
pub struct MemoryVectorStore {
  indexes: RwLock<HashMap<String, Index>>,
}

impl MemoryVectorStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of vectors in `index`.
  pub async fn count(&self, index: &str) -> Result<usize, RagError> {
    let indexes = self.indexes.read().await;
    indexes
      .get(index)
      .map(|i| i.entries.len())
      .ok_or_else(|| RagError::IndexNotFound {
        index: index.to_string(),
      })
  }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
  async fn create_index(&self, name: &str, dimension: usize) -> Result<(), RagError> {
    let mut indexes = self.indexes.write().await;
    if indexes.contains_key(name) {
      return Err(RagError::IndexExists {
        index: name.to_string(),
      });
    }
    indexes.insert(
      name.to_string(),
      Index {
        dimension,
        entries: Vec::new(),
      },
    );
    debug!(index = %name, dimension, "created index");
    Ok(())
  }

  async fn upsert(
    &self,
    index: &str,
    vectors: Vec<Embedding>,
    metadata: Vec<Metadata>,
  ) -> Result<Vec<String>, RagError> {
    if vectors.len() != metadata.len() {
      return Err(RagError::MetadataMismatch {
        vectors: vectors.len(),
        metadata: metadata.len(),
      });
    }

    let mut indexes = self.indexes.write().await;
    let target = indexes.get_mut(index).ok_or_else(|| RagError::IndexNotFound {
      index: index.to_string(),
    })?;

    // Check everything before inserting anything.
    if let Some(bad) = vectors.iter().find(|v| v.len() != target.dimension) {
      return Err(RagError::DimensionMismatch {
        index: index.to_string(),
        expected: target.dimension,
        actual: bad.len(),
      });
    }

    let ids: Vec<String> = vectors
      .into_iter()
      .zip(metadata)
      .map(|(vector, metadata)| {
        let id = uuid::Uuid::new_v4().to_string();
        target.entries.push(Entry {
          id: id.clone(),
          vector,
          metadata,
        });
        id
      })
      .collect();

    debug!(index = %index, count = ids.len(), "upserted vectors");
    Ok(ids)
  }

  async fn query(
    &self,
    index: &str,
    vector: &[f32],
    top_k: usize,
  ) -> Result<Vec<QueryResult>, RagError> {
    let indexes = self.indexes.read().await;
    let target = indexes.get(index).ok_or_else(|| RagError::IndexNotFound {
      index: index.to_string(),
    })?;

    if vector.len() != target.dimension {
      return Err(RagError::DimensionMismatch {
        index: index.to_string(),
        expected: target.dimension,
        actual: vector.len(),
      });
    }

    let mut results: Vec<QueryResult> = target
      .entries
      .iter()
      .map(|entry| QueryResult {
        id: entry.id.clone(),
        score: cosine_similarity(vector, &entry.vector),
        metadata: entry.metadata.clone(),
      })
      .collect();
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(top_k);
    Ok(results)
  }
}

/// Cosine similarity; zero if either vector has zero length.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
  let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
  let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
  let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
  if norm_a == 0.0 || norm_b == 0.0 {
    return 0.0;
  }
  dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn meta(text: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("text".to_string(), json!(text));
    metadata
  }

  #[test]
  fn test_cosine_similarity() {
    assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
  }

  #[tokio::test]
  async fn test_create_index_twice_fails() {
    let store = MemoryVectorStore::new();
    store.create_index("test_index", 3).await.unwrap();
    let err = store.create_index("test_index", 3).await.unwrap_err();
    assert!(matches!(err, RagError::IndexExists { .. }));
  }

  #[tokio::test]
  async fn test_upsert_and_query() {
    let store = MemoryVectorStore::new();
    store.create_index("test_index", 2).await.unwrap();

    let ids = store
      .upsert(
        "test_index",
        vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]],
        vec![meta("east"), meta("north"), meta("north-east")],
      )
      .await
      .unwrap();
    assert_eq!(ids.len(), 3);
    assert_eq!(store.count("test_index").await.unwrap(), 3);

    let results = store.query("test_index", &[1.0, 0.1], 2).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].metadata["text"], "east");
    assert_eq!(results[1].metadata["text"], "north-east");
    assert!(results[0].score >= results[1].score);
  }

  #[tokio::test]
  async fn test_upsert_rejects_wrong_dimension_atomically() {
    let store = MemoryVectorStore::new();
    store.create_index("test_index", 2).await.unwrap();

    let err = store
      .upsert(
        "test_index",
        vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]],
        vec![meta("ok"), meta("bad")],
      )
      .await
      .unwrap_err();

    assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 3, .. }));
    assert_eq!(store.count("test_index").await.unwrap(), 0);
  }

  #[tokio::test]
  async fn test_missing_index() {
    let store = MemoryVectorStore::new();
    let err = store.query("nope", &[1.0], 1).await.unwrap_err();
    assert!(matches!(err, RagError::IndexNotFound { .. }));
  }

  #[tokio::test]
  async fn test_metadata_count_must_match() {
    let store = MemoryVectorStore::new();
    store.create_index("test_index", 1).await.unwrap();
    let err = store
      .upsert("test_index", vec![vec![1.0]], Vec::new())
      .await
      .unwrap_err();
    assert!(matches!(err, RagError::MetadataMismatch { vectors: 1, metadata: 0 }));
  }
}
