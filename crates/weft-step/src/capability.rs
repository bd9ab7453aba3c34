//! Capabilities exposed by integrations.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use weft_schema::Schema;

use crate::error::StepError;
use crate::execute::Execute;
use crate::executor::{StepExecutor, StepInput};
use crate::step::Step;

/// What a capability is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
  /// Pulls or pushes data; registered by name on an integration.
  Sync,
  /// An invokable action, typically offered to an agent.
  Tool,
}

impl fmt::Display for CapabilityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CapabilityKind::Sync => write!(f, "sync"),
      CapabilityKind::Tool => write!(f, "tool"),
    }
  }
}

/// A described, schema-validated operation: a [`Step`] with a role.
#[derive(Debug, Clone)]
pub struct Capability {
  kind: CapabilityKind,
  step: Step,
}

impl Capability {
  /// Create a sync capability.
  pub fn sync(
    id: impl Into<String>,
    description: impl Into<String>,
    input_schema: impl Into<Schema>,
    output_schema: impl Into<Schema>,
    execute: impl Execute + 'static,
  ) -> Self {
    Self::new(
      CapabilityKind::Sync,
      id,
      description,
      input_schema,
      output_schema,
      execute,
    )
  }

  /// Create a tool capability.
  pub fn tool(
    id: impl Into<String>,
    description: impl Into<String>,
    input_schema: impl Into<Schema>,
    output_schema: impl Into<Schema>,
    execute: impl Execute + 'static,
  ) -> Self {
    Self::new(
      CapabilityKind::Tool,
      id,
      description,
      input_schema,
      output_schema,
      execute,
    )
  }

  fn new(
    kind: CapabilityKind,
    id: impl Into<String>,
    description: impl Into<String>,
    input_schema: impl Into<Schema>,
    output_schema: impl Into<Schema>,
    execute: impl Execute + 'static,
  ) -> Self {
    let step =
      Step::new(id, input_schema, output_schema, execute).with_description(description);
    Self { kind, step }
  }

  /// Bound each invocation of this capability.
  pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
    self.step = self.step.with_timeout_ms(timeout_ms);
    self
  }

  pub fn id(&self) -> &str {
    self.step.id()
  }

  pub fn kind(&self) -> CapabilityKind {
    self.kind
  }

  /// The step's description; a capability always sets one.
  pub fn description(&self) -> &str {
    self.step.description().unwrap_or_default()
  }

  pub fn input_schema(&self) -> &Schema {
    self.step.input_schema()
  }

  pub fn output_schema(&self) -> &Schema {
    self.step.output_schema()
  }

  /// The capability viewed as a step, e.g. to chain it into a workflow.
  pub fn as_step(&self) -> &Step {
    &self.step
  }

  /// Invoke the capability with a raw payload.
  ///
  /// Runs through [`StepExecutor`], so the payload and result are validated
  /// exactly as they would be for a workflow step.
  pub async fn invoke(
    &self,
    input: serde_json::Value,
    cancel: CancellationToken,
  ) -> Result<serde_json::Value, StepError> {
    StepExecutor::new()
      .execute(&self.step, StepInput::standalone(input), cancel)
      .await
      .map(|result| result.output)
  }
}
