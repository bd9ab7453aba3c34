//! The sample integration bundled with the CLI.

use serde_json::{Value, json};
use tracing::info;
use weft_integration::{Integration, Registry, ToolMap, tool_provider_fn};
use weft_schema::Schema;
use weft_step::{BoxError, Capability, Execute, Step, StepContext, execute_fn};
use weft_workflow::{Workflow, WorkflowError};

fn message_schema() -> Schema {
  Schema::object().field("message", Schema::string()).into()
}

/// Logs what it was called with and answers "Hello World".
fn hello_world() -> impl Execute {
  execute_fn(|input: Value, ctx: StepContext| async move {
    info!(step_id = %ctx.step_id, execution_id = %ctx.execution_id, input = %input, "sample called");
    Ok::<_, BoxError>(json!({ "message": "Hello World" }))
  })
}

/// Workflow `test`: takes `{name}`, runs step `test-one`.
pub fn sample_workflow() -> Result<Workflow, WorkflowError> {
  let step = Step::new(
    "test-one",
    Schema::object().field("name", Schema::string()),
    message_schema(),
    hello_world(),
  );
  Workflow::new("test", Schema::object().field("name", Schema::string())).then(step)
}

fn some_other_tool() -> Capability {
  Capability::tool(
    "Some Other Tool",
    "Some Other Tool Description",
    Schema::object(),
    message_schema(),
    hello_world(),
  )
}

pub struct SampleIntegration {
  registry: Registry,
}

impl SampleIntegration {
  pub fn new() -> Result<Self, WorkflowError> {
    let mut registry = Registry::new();

    registry.register_sync(Capability::sync(
      "SAMPLE_SYNC",
      "Sample Sync Description",
      Schema::object(),
      message_schema(),
      hello_world(),
    ));

    registry.register_workflow("SAMPLE_WORKFLOW", sample_workflow()?);

    registry.register_static_tool(
      "SAMPLE_TOOL",
      Capability::tool(
        "Sample Tool",
        "Sample Tool Description",
        Schema::object(),
        message_schema(),
        hello_world(),
      ),
    );

    registry.set_tool_provider(tool_provider_fn(|_params| async {
      let mut tools = ToolMap::new();
      tools.insert("SOME_OTHER_TOOL".to_string(), some_other_tool());
      Ok::<_, BoxError>(tools)
    }));

    Ok(Self { registry })
  }
}

impl Integration for SampleIntegration {
  fn name(&self) -> &str {
    "sample"
  }

  fn registry(&self) -> &Registry {
    &self.registry
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio_util::sync::CancellationToken;
  use weft_integration::{ToolParams, discover};
  use weft_step::Stage;

  #[test]
  fn test_static_tools_has_sample_tool_only() {
    let integration = SampleIntegration::new().unwrap();
    let keys: Vec<&String> = integration.static_tools().keys().collect();
    assert_eq!(keys, vec!["SAMPLE_TOOL"]);
  }

  #[tokio::test]
  async fn test_sample_tool_says_hello() {
    let integration = SampleIntegration::new().unwrap();
    let output = integration.static_tools()["SAMPLE_TOOL"]
      .invoke(json!({}), CancellationToken::new())
      .await
      .unwrap();
    assert_eq!(output, json!({ "message": "Hello World" }));
  }

  #[tokio::test]
  async fn test_sample_workflow() {
    let integration = SampleIntegration::new().unwrap();
    let cancel = CancellationToken::new();

    let result = integration
      .run_workflow("SAMPLE_WORKFLOW", json!({ "name": "Ada" }), cancel.clone())
      .await
      .unwrap();
    assert_eq!(result.output, json!({ "message": "Hello World" }));

    let err = sample_workflow()
      .unwrap()
      .run(json!({}), cancel)
      .await
      .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Trigger));
  }

  #[tokio::test]
  async fn test_sample_sync() {
    let integration = SampleIntegration::new().unwrap();
    let output = integration
      .invoke_sync("SAMPLE_SYNC", json!({}), CancellationToken::new())
      .await
      .unwrap();
    assert_eq!(output["message"], "Hello World");
  }

  #[tokio::test]
  async fn test_catalog_lists_static_and_dynamic_tools() {
    let integration = SampleIntegration::new().unwrap();
    let catalog = discover(&integration, &ToolParams::new(), CancellationToken::new())
      .await
      .unwrap();

    let keys: Vec<&str> = catalog.tools.iter().map(|t| t.key.as_str()).collect();
    assert_eq!(keys, vec!["SAMPLE_TOOL", "SOME_OTHER_TOOL"]);
    assert_eq!(catalog.tool("SOME_OTHER_TOOL").unwrap().id, "Some Other Tool");
    assert_eq!(catalog.workflows[0].name, "test");
  }
}
