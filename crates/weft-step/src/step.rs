//! Step definition.

use std::fmt;
use std::sync::Arc;

use weft_schema::Schema;

use crate::execute::Execute;

/// A named unit of work with declared input and output shapes.
///
/// Steps are immutable once built and cheap to clone; clones share the
/// same `execute` body.
#[derive(Clone)]
pub struct Step {
  id: String,
  description: Option<String>,
  input_schema: Schema,
  output_schema: Schema,
  timeout_ms: Option<u64>,
  execute: Arc<dyn Execute>,
}

impl Step {
  /// Create a new step.
  pub fn new(
    id: impl Into<String>,
    input_schema: impl Into<Schema>,
    output_schema: impl Into<Schema>,
    execute: impl Execute + 'static,
  ) -> Self {
    Self {
      id: id.into(),
      description: None,
      input_schema: input_schema.into(),
      output_schema: output_schema.into(),
      timeout_ms: None,
      execute: Arc::new(execute),
    }
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }

  /// Bound each invocation of this step.
  pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
    self.timeout_ms = Some(timeout_ms);
    self
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn description(&self) -> Option<&str> {
    self.description.as_deref()
  }

  pub fn input_schema(&self) -> &Schema {
    &self.input_schema
  }

  pub fn output_schema(&self) -> &Schema {
    &self.output_schema
  }

  pub fn timeout_ms(&self) -> Option<u64> {
    self.timeout_ms
  }

  pub(crate) fn body(&self) -> &dyn Execute {
    self.execute.as_ref()
  }
}

impl fmt::Debug for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Step")
      .field("id", &self.id)
      .field("description", &self.description)
      .field("input_schema", &self.input_schema)
      .field("output_schema", &self.output_schema)
      .field("timeout_ms", &self.timeout_ms)
      .finish_non_exhaustive()
  }
}
