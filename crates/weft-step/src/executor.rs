//! Schema-validated step execution.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::error::{Stage, StepError};
use crate::execute::StepContext;
use crate::step::Step;

/// Input required to execute a step.
pub struct StepInput {
  /// Execution ID this step belongs to.
  pub execution_id: String,
  /// The payload that started the run.
  pub trigger: Arc<serde_json::Value>,
  /// Raw input, validated against the step's input schema before use.
  pub input: serde_json::Value,
}

impl StepInput {
  /// Input for a step invoked on its own, outside a workflow.
  ///
  /// The input doubles as the trigger payload and a fresh execution ID is generated.
  pub fn standalone(input: serde_json::Value) -> Self {
    Self {
      execution_id: uuid::Uuid::new_v4().to_string(),
      trigger: Arc::new(input.clone()),
      input,
    }
  }
}

/// Result of a single step execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
  /// Step that was executed.
  pub step_id: String,
  /// Input after validation.
  pub input: serde_json::Value,
  /// Output after validation.
  pub output: serde_json::Value,
}

/// Executes steps, enforcing their input and output schemas.
///
/// No retries happen here; retry policy belongs to the step body or the caller.
#[derive(Debug, Clone, Default)]
pub struct StepExecutor {
  default_timeout_ms: Option<u64>,
}

impl StepExecutor {
  pub fn new() -> Self {
    Self::default()
  }

  /// Deadline applied to steps that do not declare their own.
  pub fn with_default_timeout_ms(mut self, timeout_ms: u64) -> Self {
    self.default_timeout_ms = Some(timeout_ms);
    self
  }

  /// Execute a step.
  #[instrument(
    name = "step_execute",
    skip(self, step, input, cancel),
    fields(
      execution_id = %input.execution_id,
      step_id = %step.id(),
    )
  )]
  pub async fn execute(
    &self,
    step: &Step,
    input: StepInput,
    cancel: CancellationToken,
  ) -> Result<StepResult, StepError> {
    info!(input = %input.input, "step started");

    let result = self.execute_inner(step, input, cancel).await;

    match &result {
      Ok(step_result) => {
        info!(output = %step_result.output, "step completed");
      }
      Err(StepError::Cancelled) => {
        warn!("step cancelled");
      }
      Err(e) => {
        error!(error = %e, "step failed");
      }
    }

    result
  }

  /// Inner execution logic.
  async fn execute_inner(
    &self,
    step: &Step,
    input: StepInput,
    cancel: CancellationToken,
  ) -> Result<StepResult, StepError> {
    if cancel.is_cancelled() {
      return Err(StepError::Cancelled);
    }

    let validated =
      step
        .input_schema()
        .validate(&input.input)
        .map_err(|details| StepError::Validation {
          step_id: step.id().to_string(),
          stage: Stage::Input,
          details,
        })?;

    let ctx = StepContext {
      execution_id: input.execution_id,
      step_id: step.id().to_string(),
      trigger: input.trigger,
      cancel: cancel.clone(),
    };

    let timeout_ms = step.timeout_ms().or(self.default_timeout_ms);
    let run = async {
      let body = step.body().execute(validated.clone(), ctx);
      let outcome = match timeout_ms {
        Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), body).await {
          Ok(outcome) => outcome,
          Err(_) => {
            return Err(StepError::Timeout {
              step_id: step.id().to_string(),
              timeout_ms: ms,
            });
          }
        },
        None => body.await,
      };
      outcome.map_err(|source| StepError::Execution {
        step_id: step.id().to_string(),
        source,
      })
    };

    let raw = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(StepError::Cancelled),
      outcome = run => outcome,
    };

    // A result that raced with cancellation is discarded.
    if cancel.is_cancelled() {
      return Err(StepError::Cancelled);
    }
    let raw = raw?;

    let output =
      step
        .output_schema()
        .validate(&raw)
        .map_err(|details| StepError::Validation {
          step_id: step.id().to_string(),
          stage: Stage::Output,
          details,
        })?;

    Ok(StepResult {
      step_id: step.id().to_string(),
      input: validated,
      output,
    })
  }
}
