//! Step error types.

use std::fmt;

use serde::{Deserialize, Serialize};
use weft_schema::ValidationDetails;

/// Boxed error returned by step implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The point at which a schema check happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
  /// Workflow trigger payload.
  Trigger,
  /// Step input, before `execute` runs.
  Input,
  /// Step output, after `execute` returns.
  Output,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Stage::Trigger => write!(f, "trigger"),
      Stage::Input => write!(f, "input"),
      Stage::Output => write!(f, "output"),
    }
  }
}

/// Errors that can occur while executing a single step or capability.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
  /// Input or output did not satisfy the declared schema.
  ///
  /// An `Output` stage failure is a defect in the step, not in the caller's payload.
  #[error("{stage} validation failed for step '{step_id}': {details}")]
  Validation {
    step_id: String,
    stage: Stage,
    details: ValidationDetails,
  },

  /// The step's own `execute` failed.
  #[error("step '{step_id}' failed: {source}")]
  Execution {
    step_id: String,
    #[source]
    source: BoxError,
  },

  /// The step did not finish within its deadline.
  #[error("step '{step_id}' timed out after {timeout_ms}ms")]
  Timeout { step_id: String, timeout_ms: u64 },

  /// Execution was cancelled by the caller.
  #[error("execution cancelled")]
  Cancelled,
}

impl StepError {
  /// The step this error belongs to, if any.
  pub fn step_id(&self) -> Option<&str> {
    match self {
      StepError::Validation { step_id, .. }
      | StepError::Execution { step_id, .. }
      | StepError::Timeout { step_id, .. } => Some(step_id),
      StepError::Cancelled => None,
    }
  }

  /// The validation stage, for validation errors.
  pub fn stage(&self) -> Option<Stage> {
    match self {
      StepError::Validation { stage, .. } => Some(*stage),
      _ => None,
    }
  }
}
