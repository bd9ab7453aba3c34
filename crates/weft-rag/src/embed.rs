//! Embedding with bounded retries.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use weft_step::BoxError;

use crate::error::RagError;

/// A dense vector.
pub type Embedding = Vec<f32>;

/// Which provider and model to embed with, and how hard to try.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedOptions {
  pub provider: String,
  pub model: String,
  /// Retries after the first attempt.
  pub max_retries: u32,
  /// Delay before the first retry; doubles on each further retry.
  pub retry_delay_ms: u64,
  /// Upper bound on the retry delay.
  pub max_retry_delay_ms: u64,
}

impl Default for EmbedOptions {
  fn default() -> Self {
    Self {
      provider: "OPEN_AI".to_string(),
      model: "text-embedding-ada-002".to_string(),
      max_retries: 3,
      retry_delay_ms: 200,
      max_retry_delay_ms: 5_000,
    }
  }
}

impl EmbedOptions {
  pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
    Self {
      provider: provider.into(),
      model: model.into(),
      ..Self::default()
    }
  }

  pub fn with_max_retries(mut self, max_retries: u32) -> Self {
    self.max_retries = max_retries;
    self
  }

  pub fn with_retry_delay_ms(mut self, retry_delay_ms: u64) -> Self {
    self.retry_delay_ms = retry_delay_ms;
    self
  }

  fn retry_delay(&self, retries_used: u32) -> Duration {
    if self.retry_delay_ms == 0 {
      return Duration::ZERO;
    }
    let max = self.max_retry_delay_ms.max(self.retry_delay_ms);
    let multiplier = 1u64 << retries_used.min(20);
    Duration::from_millis(self.retry_delay_ms.saturating_mul(multiplier).min(max))
  }
}

/// Turns texts into vectors, one per text, in order.
#[async_trait]
pub trait Embedder: Send + Sync {
  async fn embed(&self, texts: &[String], options: &EmbedOptions) -> Result<Vec<Embedding>, BoxError>;
}

/// Embed `texts`, retrying failed attempts up to `options.max_retries` times.
///
/// Every embedder failure is treated as transient. Once retries are
/// exhausted the last failure is returned as [`RagError::Embedding`].
/// A result with the wrong number of vectors is not retried.
pub async fn embed_with_retries(
  embedder: &dyn Embedder,
  texts: &[String],
  options: &EmbedOptions,
  cancel: &CancellationToken,
) -> Result<Vec<Embedding>, RagError> {
  if texts.is_empty() {
    return Ok(Vec::new());
  }

  let mut retries_used = 0;
  loop {
    if cancel.is_cancelled() {
      return Err(RagError::Cancelled);
    }

    let attempt = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(RagError::Cancelled),
      attempt = embedder.embed(texts, options) => attempt,
    };

    match attempt {
      Ok(embeddings) => {
        if embeddings.len() != texts.len() {
          return Err(RagError::EmbeddingCount {
            expected: texts.len(),
            actual: embeddings.len(),
          });
        }
        debug!(
          provider = %options.provider,
          model = %options.model,
          count = embeddings.len(),
          attempts = retries_used + 1,
          "embedded texts"
        );
        return Ok(embeddings);
      }
      Err(source) if retries_used >= options.max_retries => {
        return Err(RagError::Embedding {
          attempts: retries_used + 1,
          source,
        });
      }
      Err(e) => {
        let delay = options.retry_delay(retries_used);
        retries_used += 1;
        warn!(
          provider = %options.provider,
          model = %options.model,
          error = %e,
          retry_attempt = retries_used,
          retry_in_ms = delay.as_millis() as u64,
          "retrying embedding after error"
        );
        tokio::select! {
          biased;
          _ = cancel.cancelled() => return Err(RagError::Cancelled),
          _ = tokio::time::sleep(delay) => {}
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_retry_delay_doubles_and_caps() {
    let options = EmbedOptions {
      retry_delay_ms: 100,
      max_retry_delay_ms: 350,
      ..EmbedOptions::default()
    };
    assert_eq!(options.retry_delay(0), Duration::from_millis(100));
    assert_eq!(options.retry_delay(1), Duration::from_millis(200));
    assert_eq!(options.retry_delay(2), Duration::from_millis(350));
    assert_eq!(options.retry_delay(40), Duration::from_millis(350));
  }

  #[test]
  fn test_zero_delay() {
    let options = EmbedOptions::default().with_retry_delay_ms(0);
    assert_eq!(options.retry_delay(3), Duration::ZERO);
  }

  #[test]
  fn test_defaults_match_ada() {
    let options = EmbedOptions::default();
    assert_eq!(options.provider, "OPEN_AI");
    assert_eq!(options.model, "text-embedding-ada-002");
    assert_eq!(options.max_retries, 3);
  }
}
