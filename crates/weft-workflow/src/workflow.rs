//! Workflow composition.

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use weft_schema::Schema;
use weft_step::Step;

use crate::error::WorkflowError;
use crate::execution::{RunResult, WorkflowExecution};

/// An ordered, named sequence of steps sharing a trigger schema.
///
/// Workflows are values: [`then`](Workflow::then) returns a new workflow with
/// the step appended and leaves `self` untouched.
#[derive(Debug, Clone)]
pub struct Workflow {
  name: String,
  trigger_schema: Schema,
  steps: Vec<Step>,
  timeout_ms: Option<u64>,
}

impl Workflow {
  /// Create an empty workflow.
  pub fn new(name: impl Into<String>, trigger_schema: impl Into<Schema>) -> Self {
    Self {
      name: name.into(),
      trigger_schema: trigger_schema.into(),
      steps: Vec::new(),
      timeout_ms: None,
    }
  }

  /// Bound the whole run.
  pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
    self.timeout_ms = Some(timeout_ms);
    self
  }

  /// Append a step.
  ///
  /// Fails if a step with the same ID is already in the workflow.
  pub fn then(&self, step: Step) -> Result<Workflow, WorkflowError> {
    self.then_all([step])
  }

  /// Append several steps in order, with the same rules as [`then`](Workflow::then).
  pub fn then_all(&self, steps: impl IntoIterator<Item = Step>) -> Result<Workflow, WorkflowError> {
    let mut next = self.clone();
    for step in steps {
      if next.steps.iter().any(|s| s.id() == step.id()) {
        return Err(WorkflowError::DuplicateStep {
          workflow: self.name.clone(),
          step_id: step.id().to_string(),
        });
      }
      next.steps.push(step);
    }
    Ok(next)
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn trigger_schema(&self) -> &Schema {
    &self.trigger_schema
  }

  pub fn steps(&self) -> &[Step] {
    &self.steps
  }

  /// Step IDs in execution order.
  pub fn step_ids(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.id()).collect()
  }

  pub fn timeout_ms(&self) -> Option<u64> {
    self.timeout_ms
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  /// Prepare a run for `payload`.
  ///
  /// Call `.wait()` on the returned handle to execute it.
  pub fn execute(&self, payload: Value, cancel: CancellationToken) -> WorkflowExecution<'_> {
    WorkflowExecution::new(self, uuid::Uuid::new_v4().to_string(), payload, cancel)
  }

  /// Run the workflow to completion with default execution settings.
  pub async fn run(
    &self,
    payload: Value,
    cancel: CancellationToken,
  ) -> Result<RunResult, WorkflowError> {
    self.execute(payload, cancel).wait().await
  }
}
