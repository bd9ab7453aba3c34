//! Dynamic tool resolution.

use std::collections::BTreeMap;
use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use weft_step::BoxError;

use crate::registry::ToolMap;

/// Caller-supplied parameters for resolving dynamic tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolParams {
  /// Credentials the provider may need (API keys, tokens).
  #[serde(default)]
  pub credentials: BTreeMap<String, String>,
  /// Free-form context, e.g. the connected account.
  #[serde(default)]
  pub context: serde_json::Value,
}

impl ToolParams {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_credential(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.credentials.insert(name.into(), value.into());
    self
  }

  pub fn with_context(mut self, context: serde_json::Value) -> Self {
    self.context = context;
    self
  }

  pub fn credential(&self, name: &str) -> Option<&str> {
    self.credentials.get(name).map(String::as_str)
  }
}

/// Resolves an integration's dynamic tools for a set of parameters.
///
/// Evaluated on every call; results are never cached.
#[async_trait]
pub trait ToolProvider: Send + Sync {
  async fn tools(&self, params: &ToolParams) -> Result<ToolMap, BoxError>;
}

/// Adapter turning an async closure into a [`ToolProvider`].
pub struct ToolProviderFn<F> {
  f: F,
}

/// Wrap an async closure as a [`ToolProvider`]. The closure receives its own
/// copy of the parameters.
pub fn tool_provider_fn<F, Fut>(f: F) -> ToolProviderFn<F>
where
  F: Fn(ToolParams) -> Fut + Send + Sync,
  Fut: Future<Output = Result<ToolMap, BoxError>> + Send,
{
  ToolProviderFn { f }
}

#[async_trait]
impl<F, Fut> ToolProvider for ToolProviderFn<F>
where
  F: Fn(ToolParams) -> Fut + Send + Sync,
  Fut: Future<Output = Result<ToolMap, BoxError>> + Send,
{
  async fn tools(&self, params: &ToolParams) -> Result<ToolMap, BoxError> {
    (self.f)(params.clone()).await
  }
}
