//! Serializable snapshot of what an integration exposes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use weft_step::{Capability, CapabilityKind};
use weft_workflow::Workflow;

use crate::error::IntegrationError;
use crate::integration::Integration;
use crate::provider::ToolParams;

/// Everything an integration offers, with schemas rendered as JSON Schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
  pub integration: String,
  pub syncs: Vec<CapabilityEntry>,
  pub workflows: Vec<WorkflowEntry>,
  /// Union of static and dynamic tools, dynamic entries taking precedence.
  pub tools: Vec<CapabilityEntry>,
  /// Why dynamic tools are missing from `tools`, if resolving them failed.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tool_resolution_error: Option<String>,
}

/// A sync or tool in a [`Catalog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityEntry {
  /// Key the capability is registered under.
  pub key: String,
  /// The capability's own id.
  pub id: String,
  pub kind: CapabilityKind,
  pub description: String,
  pub input_schema: Value,
  pub output_schema: Value,
}

/// A workflow in a [`Catalog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEntry {
  /// Name the workflow is registered under.
  pub key: String,
  pub name: String,
  pub steps: Vec<String>,
  pub trigger_schema: Value,
}

impl CapabilityEntry {
  pub fn new(key: &str, capability: &Capability) -> Self {
    Self {
      key: key.to_string(),
      id: capability.id().to_string(),
      kind: capability.kind(),
      description: capability.description().to_string(),
      input_schema: capability.input_schema().to_json_schema(),
      output_schema: capability.output_schema().to_json_schema(),
    }
  }
}

impl WorkflowEntry {
  pub fn new(key: &str, workflow: &Workflow) -> Self {
    Self {
      key: key.to_string(),
      name: workflow.name().to_string(),
      steps: workflow.step_ids().into_iter().map(String::from).collect(),
      trigger_schema: workflow.trigger_schema().to_json_schema(),
    }
  }
}

impl Catalog {
  /// Find a tool entry by key.
  pub fn tool(&self, key: &str) -> Option<&CapabilityEntry> {
    self.tools.iter().find(|entry| entry.key == key)
  }
}

/// Build a [`Catalog`] for `integration`, resolving dynamic tools with `params`.
///
/// A failing tool provider does not fail discovery: the catalog keeps the
/// syncs, workflows and static tools and records the failure in
/// `tool_resolution_error`. Cancellation is still returned as an error.
pub async fn discover<I>(
  integration: &I,
  params: &ToolParams,
  cancel: CancellationToken,
) -> Result<Catalog, IntegrationError>
where
  I: Integration + ?Sized,
{
  let mut tools = integration.static_tools().clone();
  let tool_resolution_error = match integration.tools(params, cancel).await {
    Ok(dynamic) => {
      tools.extend(dynamic);
      None
    }
    Err(e @ IntegrationError::ToolResolution { .. }) => {
      warn!(integration = %integration.name(), error = %e, "listing static tools only");
      Some(e.to_string())
    }
    Err(e) => return Err(e),
  };

  Ok(Catalog {
    integration: integration.name().to_string(),
    syncs: integration
      .syncs()
      .iter()
      .map(|(key, sync)| CapabilityEntry::new(key, sync))
      .collect(),
    workflows: integration
      .workflows()
      .iter()
      .map(|(key, workflow)| WorkflowEntry::new(key, workflow))
      .collect(),
    tools: tools
      .iter()
      .map(|(key, tool)| CapabilityEntry::new(key, tool))
      .collect(),
    tool_resolution_error,
  })
}
