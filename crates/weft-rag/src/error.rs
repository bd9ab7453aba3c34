use weft_step::BoxError;

/// Errors from the chunk / embed / store collaborators.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
  /// The embedder kept failing after every allowed retry.
  #[error("embedding failed after {attempts} attempt(s): {source}")]
  Embedding {
    attempts: u32,
    #[source]
    source: BoxError,
  },

  #[error("embedder returned {actual} embedding(s) for {expected} text(s)")]
  EmbeddingCount { expected: usize, actual: usize },

  #[error("index '{index}' not found")]
  IndexNotFound { index: String },

  #[error("index '{index}' already exists")]
  IndexExists { index: String },

  #[error("index '{index}' expects dimension {expected}, got {actual}")]
  DimensionMismatch {
    index: String,
    expected: usize,
    actual: usize,
  },

  #[error("got {vectors} vector(s) but {metadata} metadata entries")]
  MetadataMismatch { vectors: usize, metadata: usize },

  #[error("execution cancelled")]
  Cancelled,
}
