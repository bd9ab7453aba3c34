use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use weft_step::Capability;
use weft_workflow::{RunResult, Workflow};

use crate::error::{EntryKind, IntegrationError};
use crate::provider::ToolParams;
use crate::registry::{Registry, ToolMap};

/// A named bundle of syncs, workflows and tools.
///
/// Implementors own a [`Registry`], fill it while they are constructed and
/// hand it out through [`registry`](Integration::registry). Everything else
/// has a default built on top of it.
///
/// ```ignore
/// struct Sample { registry: Registry }
///
/// impl Integration for Sample {
///   fn name(&self) -> &str { "sample" }
///   fn registry(&self) -> &Registry { &self.registry }
/// }
/// ```
#[async_trait]
pub trait Integration: Send + Sync {
  fn name(&self) -> &str;

  fn registry(&self) -> &Registry;

  fn syncs(&self) -> &BTreeMap<String, Capability> {
    self.registry().syncs()
  }

  fn workflows(&self) -> &BTreeMap<String, Arc<Workflow>> {
    self.registry().workflows()
  }

  /// Tools that are always available.
  fn static_tools(&self) -> &ToolMap {
    self.registry().static_tools()
  }

  /// Tools resolved for `params`. Re-evaluated on every call.
  async fn tools(
    &self,
    params: &ToolParams,
    cancel: CancellationToken,
  ) -> Result<ToolMap, IntegrationError> {
    self.registry().resolve_tools(self.name(), params, cancel).await
  }

  /// Static and dynamic tools together. A dynamic tool replaces a static
  /// tool exposed under the same key.
  async fn all_tools(
    &self,
    params: &ToolParams,
    cancel: CancellationToken,
  ) -> Result<ToolMap, IntegrationError> {
    let mut tools = self.static_tools().clone();
    tools.extend(self.tools(params, cancel).await?);
    Ok(tools)
  }

  async fn invoke_sync(
    &self,
    id: &str,
    input: Value,
    cancel: CancellationToken,
  ) -> Result<Value, IntegrationError> {
    let sync = self
      .registry()
      .sync(id)
      .ok_or_else(|| not_found(self.name(), EntryKind::Sync, id))?;
    info!(integration = %self.name(), sync_id = %id, "invoking sync");
    Ok(sync.invoke(input, cancel).await?)
  }

  async fn invoke_tool(
    &self,
    key: &str,
    input: Value,
    params: &ToolParams,
    cancel: CancellationToken,
  ) -> Result<Value, IntegrationError> {
    let dynamic = match self.tools(params, cancel.clone()).await {
      Ok(tools) => tools,
      // A failing provider does not hide the static tools.
      Err(IntegrationError::ToolResolution { source, .. })
        if self.static_tools().contains_key(key) =>
      {
        warn!(
          integration = %self.name(),
          tool = %key,
          error = %source,
          "dynamic tools unavailable, using static tool"
        );
        ToolMap::new()
      }
      Err(e) => return Err(e),
    };
    let tool = dynamic
      .get(key)
      .or_else(|| self.static_tools().get(key))
      .ok_or_else(|| not_found(self.name(), EntryKind::Tool, key))?;
    info!(integration = %self.name(), tool = %key, tool_id = %tool.id(), "invoking tool");
    Ok(tool.invoke(input, cancel).await?)
  }

  async fn run_workflow(
    &self,
    name: &str,
    payload: Value,
    cancel: CancellationToken,
  ) -> Result<RunResult, IntegrationError> {
    let workflow = self
      .registry()
      .workflow(name)
      .ok_or_else(|| not_found(self.name(), EntryKind::Workflow, name))?;
    info!(integration = %self.name(), workflow = %name, "running workflow");
    Ok(workflow.run(payload, cancel).await?)
  }
}

fn not_found(integration: &str, kind: EntryKind, id: &str) -> IntegrationError {
  IntegrationError::NotFound {
    integration: integration.to_string(),
    kind,
    id: id.to_string(),
  }
}
