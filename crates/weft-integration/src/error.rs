use std::fmt;

use serde::{Deserialize, Serialize};
use weft_step::{BoxError, StepError};
use weft_workflow::WorkflowError;

/// The kinds of entries an integration exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
  Sync,
  Workflow,
  Tool,
}

impl fmt::Display for EntryKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      EntryKind::Sync => write!(f, "sync"),
      EntryKind::Workflow => write!(f, "workflow"),
      EntryKind::Tool => write!(f, "tool"),
    }
  }
}

/// Errors from looking up or invoking integration entries.
#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
  #[error("{kind} '{id}' not found in integration '{integration}'")]
  NotFound {
    integration: String,
    kind: EntryKind,
    id: String,
  },

  /// The dynamic tool provider failed. Distinct from validation failures.
  #[error("failed to resolve tools for integration '{integration}': {source}")]
  ToolResolution {
    integration: String,
    #[source]
    source: BoxError,
  },

  #[error(transparent)]
  Step(#[from] StepError),

  #[error(transparent)]
  Workflow(#[from] WorkflowError),

  #[error("execution cancelled")]
  Cancelled,
}

impl IntegrationError {
  /// Whether the caller aborted the operation, at any layer.
  pub fn is_cancelled(&self) -> bool {
    matches!(
      self,
      IntegrationError::Cancelled
        | IntegrationError::Step(StepError::Cancelled)
        | IntegrationError::Workflow(WorkflowError::Cancelled)
    )
  }
}
