//! Tests for StepExecutor's validation, timeout and cancellation handling.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use weft_schema::Schema;
use weft_step::{
  BoxError, Stage, Step, StepError, StepExecutor, StepInput, execute_fn, typed,
};

fn name_schema() -> Schema {
  Schema::object().field("name", Schema::string()).into()
}

fn message_schema() -> Schema {
  Schema::object().field("message", Schema::string()).into()
}

/// A step that counts its invocations and returns `output`.
fn counting_step(id: &str, calls: Arc<AtomicUsize>, output: Value) -> Step {
  Step::new(
    id,
    name_schema(),
    message_schema(),
    execute_fn(move |_input, _ctx| {
      let calls = calls.clone();
      let output = output.clone();
      async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, BoxError>(output)
      }
    }),
  )
}

fn sleeping_step(id: &str, sleep: Duration) -> Step {
  Step::new(
    id,
    Schema::Any,
    Schema::Any,
    execute_fn(move |input, _ctx| async move {
      tokio::time::sleep(sleep).await;
      Ok::<_, BoxError>(input)
    }),
  )
}

#[tokio::test]
async fn test_valid_input_produces_validated_output() {
  let calls = Arc::new(AtomicUsize::new(0));
  let step = counting_step(
    "greet",
    calls.clone(),
    json!({ "message": "Hello World", "debug": true }),
  );

  let result = StepExecutor::new()
    .execute(
      &step,
      StepInput::standalone(json!({ "name": "Ada", "ignored": 1 })),
      CancellationToken::new(),
    )
    .await
    .expect("step should succeed");

  assert_eq!(result.step_id, "greet");
  assert_eq!(result.input, json!({ "name": "Ada" }));
  assert_eq!(result.output, json!({ "message": "Hello World" }));
  assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_input_validation_prevents_execution() {
  let calls = Arc::new(AtomicUsize::new(0));
  let step = counting_step("greet", calls.clone(), json!({ "message": "hi" }));

  let err = StepExecutor::new()
    .execute(
      &step,
      StepInput::standalone(json!({ "name": 42 })),
      CancellationToken::new(),
    )
    .await
    .unwrap_err();

  match err {
    StepError::Validation {
      step_id,
      stage,
      details,
    } => {
      assert_eq!(step_id, "greet");
      assert_eq!(stage, Stage::Input);
      assert!(details.has_issue_at("$.name"));
    }
    other => panic!("expected input validation error, got {:?}", other),
  }
  assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_output_validation_failure_is_output_stage() {
  let calls = Arc::new(AtomicUsize::new(0));
  let step = counting_step("broken", calls.clone(), json!({ "msg": "typo" }));

  let err = StepExecutor::new()
    .execute(
      &step,
      StepInput::standalone(json!({ "name": "Ada" })),
      CancellationToken::new(),
    )
    .await
    .unwrap_err();

  assert_eq!(err.stage(), Some(Stage::Output));
  assert_eq!(err.step_id(), Some("broken"));
  assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_execution_error_is_wrapped() {
  let step = Step::new(
    "embed",
    Schema::Any,
    Schema::Any,
    execute_fn(|_input, _ctx| async move {
      Err::<Value, BoxError>("provider exhausted retries".into())
    }),
  );

  let err = StepExecutor::new()
    .execute(
      &step,
      StepInput::standalone(json!({})),
      CancellationToken::new(),
    )
    .await
    .unwrap_err();

  match err {
    StepError::Execution { step_id, source } => {
      assert_eq!(step_id, "embed");
      assert_eq!(source.to_string(), "provider exhausted retries");
    }
    other => panic!("expected execution error, got {:?}", other),
  }
}

#[tokio::test]
async fn test_step_timeout() {
  let step = sleeping_step("slow", Duration::from_secs(5)).with_timeout_ms(20);

  let err = StepExecutor::new()
    .execute(
      &step,
      StepInput::standalone(json!({})),
      CancellationToken::new(),
    )
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    StepError::Timeout { ref step_id, timeout_ms: 20 } if step_id == "slow"
  ));
}

#[tokio::test]
async fn test_default_timeout_applies_when_step_has_none() {
  let step = sleeping_step("slow", Duration::from_secs(5));

  let err = StepExecutor::new()
    .with_default_timeout_ms(20)
    .execute(
      &step,
      StepInput::standalone(json!({})),
      CancellationToken::new(),
    )
    .await
    .unwrap_err();

  assert!(matches!(err, StepError::Timeout { timeout_ms: 20, .. }));
}

#[tokio::test]
async fn test_cancelled_before_start() {
  let calls = Arc::new(AtomicUsize::new(0));
  let step = counting_step("greet", calls.clone(), json!({ "message": "hi" }));

  let cancel = CancellationToken::new();
  cancel.cancel();

  let err = StepExecutor::new()
    .execute(&step, StepInput::standalone(json!({ "name": "Ada" })), cancel)
    .await
    .unwrap_err();

  assert!(matches!(err, StepError::Cancelled));
  assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancelled_during_execution() {
  let step = sleeping_step("slow", Duration::from_secs(5));
  let cancel = CancellationToken::new();

  let trigger = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(20)).await;
    trigger.cancel();
  });

  let err = StepExecutor::new()
    .execute(&step, StepInput::standalone(json!({})), cancel)
    .await
    .unwrap_err();

  assert!(matches!(err, StepError::Cancelled));
}

#[tokio::test]
async fn test_cancellation_discards_completed_output() {
  let step = Step::new(
    "greet",
    name_schema(),
    message_schema(),
    execute_fn(|_input, ctx| async move {
      ctx.cancel.cancel();
      Ok::<_, BoxError>(json!({ "message": "hi" }))
    }),
  );

  let cancel = CancellationToken::new();
  let err = StepExecutor::new()
    .execute(&step, StepInput::standalone(json!({ "name": "Ada" })), cancel.clone())
    .await
    .unwrap_err();

  assert!(matches!(err, StepError::Cancelled));
  assert!(cancel.is_cancelled());
}

#[tokio::test]
async fn test_context_carries_trigger_and_ids() {
  let step = Step::new(
    "inspect",
    Schema::Any,
    Schema::Any,
    execute_fn(|_input, ctx| async move {
      Ok::<_, BoxError>(json!({
        "execution_id": ctx.execution_id,
        "step_id": ctx.step_id,
        "trigger": ctx.trigger.as_ref().clone(),
      }))
    }),
  );

  let input = StepInput {
    execution_id: "exec-1".to_string(),
    trigger: Arc::new(json!({ "name": "Ada" })),
    input: json!({ "previous": true }),
  };

  let result = StepExecutor::new()
    .execute(&step, input, CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(result.output["execution_id"], "exec-1");
  assert_eq!(result.output["step_id"], "inspect");
  assert_eq!(result.output["trigger"]["name"], "Ada");
}

#[derive(Deserialize)]
struct Greeting {
  name: String,
}

#[derive(Serialize)]
struct Message {
  message: String,
}

#[tokio::test]
async fn test_typed_step() {
  let step = Step::new(
    "typed-greet",
    name_schema(),
    message_schema(),
    typed(|input: Greeting, _ctx| async move {
      Ok::<_, BoxError>(Message {
        message: format!("Hello {}", input.name),
      })
    }),
  );

  let result = StepExecutor::new()
    .execute(
      &step,
      StepInput::standalone(json!({ "name": "Ada" })),
      CancellationToken::new(),
    )
    .await
    .unwrap();

  assert_eq!(result.output, json!({ "message": "Hello Ada" }));
}
