//! The registry an integration is built around.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use weft_step::Capability;
use weft_workflow::Workflow;

use crate::error::IntegrationError;
use crate::provider::{ToolParams, ToolProvider};

/// Tools keyed by the name they are exposed under.
pub type ToolMap = BTreeMap<String, Capability>;

/// Syncs, workflows and tools owned by one integration.
///
/// Populated while the integration is constructed, then only read.
/// Registering an id that already exists replaces the previous entry.
#[derive(Clone, Default)]
pub struct Registry {
  syncs: BTreeMap<String, Capability>,
  workflows: BTreeMap<String, Arc<Workflow>>,
  static_tools: ToolMap,
  tool_provider: Option<Arc<dyn ToolProvider>>,
}

impl Registry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a sync under its own id. Returns the sync it replaced, if any.
  pub fn register_sync(&mut self, sync: Capability) -> Option<Capability> {
    let id = sync.id().to_string();
    let replaced = self.syncs.insert(id.clone(), sync);
    if replaced.is_some() {
      warn!(sync_id = %id, "replacing registered sync");
    } else {
      debug!(sync_id = %id, "registered sync");
    }
    replaced
  }

  /// Register a workflow under `name`. Returns the workflow it replaced, if any.
  pub fn register_workflow(
    &mut self,
    name: impl Into<String>,
    workflow: impl Into<Arc<Workflow>>,
  ) -> Option<Arc<Workflow>> {
    let name = name.into();
    let replaced = self.workflows.insert(name.clone(), workflow.into());
    if replaced.is_some() {
      warn!(workflow = %name, "replacing registered workflow");
    } else {
      debug!(workflow = %name, "registered workflow");
    }
    replaced
  }

  /// Register a tool that is always available under `key`.
  pub fn register_static_tool(
    &mut self,
    key: impl Into<String>,
    tool: Capability,
  ) -> Option<Capability> {
    self.static_tools.insert(key.into(), tool)
  }

  /// Set the provider evaluated by [`resolve_tools`](Registry::resolve_tools).
  pub fn set_tool_provider(&mut self, provider: impl ToolProvider + 'static) {
    self.tool_provider = Some(Arc::new(provider));
  }

  pub fn sync(&self, id: &str) -> Option<&Capability> {
    self.syncs.get(id)
  }

  pub fn syncs(&self) -> &BTreeMap<String, Capability> {
    &self.syncs
  }

  pub fn workflow(&self, name: &str) -> Option<&Arc<Workflow>> {
    self.workflows.get(name)
  }

  pub fn workflows(&self) -> &BTreeMap<String, Arc<Workflow>> {
    &self.workflows
  }

  pub fn static_tools(&self) -> &ToolMap {
    &self.static_tools
  }

  pub fn has_tool_provider(&self) -> bool {
    self.tool_provider.is_some()
  }

  /// Evaluate the tool provider with `params`.
  ///
  /// Without a provider this is an empty map. Provider failures surface as
  /// [`IntegrationError::ToolResolution`]; a fired token wins over a
  /// provider that completes at the same time.
  pub async fn resolve_tools(
    &self,
    integration: &str,
    params: &ToolParams,
    cancel: CancellationToken,
  ) -> Result<ToolMap, IntegrationError> {
    let Some(provider) = &self.tool_provider else {
      return Ok(ToolMap::new());
    };

    if cancel.is_cancelled() {
      return Err(IntegrationError::Cancelled);
    }

    let tools = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(IntegrationError::Cancelled),
      tools = provider.tools(params) => tools,
    };

    if cancel.is_cancelled() {
      return Err(IntegrationError::Cancelled);
    }

    let tools = tools.map_err(|source| IntegrationError::ToolResolution {
      integration: integration.to_string(),
      source,
    })?;
    debug!(integration = %integration, count = tools.len(), "resolved dynamic tools");
    Ok(tools)
  }
}

impl fmt::Debug for Registry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Registry")
      .field("syncs", &self.syncs.keys().collect::<Vec<_>>())
      .field("workflows", &self.workflows.keys().collect::<Vec<_>>())
      .field("static_tools", &self.static_tools.keys().collect::<Vec<_>>())
      .field("has_tool_provider", &self.tool_provider.is_some())
      .finish()
  }
}
