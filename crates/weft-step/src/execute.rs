//! The [`Execute`] seam and its adapters.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::BoxError;

/// Context handed to a step's `execute` alongside its validated input.
#[derive(Debug, Clone)]
pub struct StepContext {
  /// Execution this invocation belongs to.
  pub execution_id: String,
  /// Step (or capability) being executed.
  pub step_id: String,
  /// The payload that started the run.
  pub trigger: Arc<Value>,
  /// Fires when the caller aborts the run.
  pub cancel: CancellationToken,
}

/// The body of a step.
///
/// Receives input already validated against the step's input schema. The
/// returned value is validated against the output schema by the caller.
#[async_trait]
pub trait Execute: Send + Sync {
  async fn execute(&self, input: Value, ctx: StepContext) -> Result<Value, BoxError>;
}

/// Adapter turning an async closure over JSON values into an [`Execute`].
pub struct ExecuteFn<F> {
  f: F,
}

/// Wrap an async closure as an [`Execute`].
///
/// ```ignore
/// let execute = execute_fn(|_input, _ctx| async move {
///   Ok(serde_json::json!({ "message": "Hello World" }))
/// });
/// ```
pub fn execute_fn<F, Fut>(f: F) -> ExecuteFn<F>
where
  F: Fn(Value, StepContext) -> Fut + Send + Sync,
  Fut: Future<Output = Result<Value, BoxError>> + Send,
{
  ExecuteFn { f }
}

#[async_trait]
impl<F, Fut> Execute for ExecuteFn<F>
where
  F: Fn(Value, StepContext) -> Fut + Send + Sync,
  Fut: Future<Output = Result<Value, BoxError>> + Send,
{
  async fn execute(&self, input: Value, ctx: StepContext) -> Result<Value, BoxError> {
    (self.f)(input, ctx).await
  }
}

/// Adapter for closures written against serde types.
pub struct Typed<F, I, O> {
  f: F,
  _marker: PhantomData<fn(I) -> O>,
}

/// Wrap an async closure taking `I` and returning `O` as an [`Execute`].
///
/// The validated input is deserialized into `I`; the returned `O` is
/// serialized back to JSON before output validation. Either conversion
/// failing is reported as an execution error.
pub fn typed<F, Fut, I, O>(f: F) -> Typed<F, I, O>
where
  F: Fn(I, StepContext) -> Fut + Send + Sync,
  Fut: Future<Output = Result<O, BoxError>> + Send,
  I: DeserializeOwned + Send,
  O: Serialize + Send,
{
  Typed {
    f,
    _marker: PhantomData,
  }
}

#[async_trait]
impl<F, Fut, I, O> Execute for Typed<F, I, O>
where
  F: Fn(I, StepContext) -> Fut + Send + Sync,
  Fut: Future<Output = Result<O, BoxError>> + Send,
  I: DeserializeOwned + Send,
  O: Serialize + Send,
{
  async fn execute(&self, input: Value, ctx: StepContext) -> Result<Value, BoxError> {
    let input: I = serde_json::from_value(input)?;
    let output = (self.f)(input, ctx).await?;
    Ok(serde_json::to_value(output)?)
  }
}
