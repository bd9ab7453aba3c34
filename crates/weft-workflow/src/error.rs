//! Workflow errors.

use weft_schema::ValidationDetails;
use weft_step::{Stage, StepError};

/// Errors raised while composing or running a workflow.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
  /// A step with this ID is already part of the workflow.
  #[error("step '{step_id}' is already part of workflow '{workflow}'")]
  DuplicateStep { workflow: String, step_id: String },

  /// The workflow was run without any steps.
  #[error("workflow '{workflow}' has no steps")]
  EmptyWorkflow { workflow: String },

  /// The trigger payload did not satisfy the trigger schema. No step ran.
  #[error("trigger validation failed for workflow '{workflow}': {details}")]
  Trigger {
    workflow: String,
    details: ValidationDetails,
  },

  /// A step failed; the remaining steps were not run.
  #[error("workflow '{workflow}' failed at step {index} ('{step_id}'): {source}")]
  Step {
    workflow: String,
    index: usize,
    step_id: String,
    #[source]
    source: StepError,
  },

  /// The whole run exceeded the workflow deadline.
  #[error("workflow '{workflow}' timed out after {timeout_ms}ms")]
  Timeout { workflow: String, timeout_ms: u64 },

  /// The runner's channel is closed.
  #[error("workflow runner channel closed for '{workflow}'")]
  ChannelClosed { workflow: String },

  /// Execution was cancelled by the caller.
  #[error("execution cancelled")]
  Cancelled,
}

impl WorkflowError {
  /// The validation stage, if this is a validation failure.
  pub fn stage(&self) -> Option<Stage> {
    match self {
      WorkflowError::Trigger { .. } => Some(Stage::Trigger),
      WorkflowError::Step { source, .. } => source.stage(),
      _ => None,
    }
  }

  /// The failing step, if a step failed.
  pub fn step_id(&self) -> Option<&str> {
    match self {
      WorkflowError::Step { step_id, .. } => Some(step_id),
      _ => None,
    }
  }

  /// The underlying step error, if a step failed.
  pub fn step_error(&self) -> Option<&StepError> {
    match self {
      WorkflowError::Step { source, .. } => Some(source),
      _ => None,
    }
  }
}
