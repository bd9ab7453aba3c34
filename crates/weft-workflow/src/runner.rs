//! Workflow runner with channel-based triggering.
//!
//! The `WorkflowRunner` owns an mpsc channel for receiving trigger payloads
//! and runs the workflow once per payload.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use weft_step::StepExecutor;

use crate::error::WorkflowError;
use crate::events::{ExecutionNotifier, NoopNotifier};
use crate::execution::RunResult;
use crate::workflow::Workflow;

/// Configuration for a [`WorkflowRunner`].
#[derive(Debug, Clone)]
pub struct RunnerConfig {
  /// Capacity of the trigger channel.
  pub buffer_size: usize,
  /// Deadline for steps that do not declare their own.
  pub default_step_timeout_ms: Option<u64>,
}

impl Default for RunnerConfig {
  fn default() -> Self {
    Self {
      buffer_size: 100,
      default_step_timeout_ms: None,
    }
  }
}

/// Runs a workflow in response to trigger payloads.
///
/// # Usage
///
/// ```ignore
/// let runner = WorkflowRunner::new(Arc::new(workflow));
///
/// // Hand the sender to whatever produces payloads (webhooks, CLI, timers)
/// let sender = runner.sender();
///
/// let cancel = CancellationToken::new();
/// runner.start(cancel).await?;
/// ```
pub struct WorkflowRunner {
  sender: mpsc::Sender<serde_json::Value>,
  receiver: mpsc::Receiver<serde_json::Value>,
  workflow: Arc<Workflow>,
  executor: StepExecutor,
  notifier: Arc<dyn ExecutionNotifier>,
}

impl WorkflowRunner {
  /// Create a runner with the default configuration.
  pub fn new(workflow: Arc<Workflow>) -> Self {
    Self::with_config(workflow, RunnerConfig::default())
  }

  pub fn with_config(workflow: Arc<Workflow>, config: RunnerConfig) -> Self {
    let (sender, receiver) = mpsc::channel(config.buffer_size);
    let executor = match config.default_step_timeout_ms {
      Some(ms) => StepExecutor::new().with_default_timeout_ms(ms),
      None => StepExecutor::new(),
    };
    Self {
      sender,
      receiver,
      workflow,
      executor,
      notifier: Arc::new(NoopNotifier),
    }
  }

  /// Report every run's events to `notifier`.
  pub fn with_notifier(mut self, notifier: Arc<dyn ExecutionNotifier>) -> Self {
    self.notifier = notifier;
    self
  }

  /// Get a sender handle for triggering runs.
  pub fn sender(&self) -> mpsc::Sender<serde_json::Value> {
    self.sender.clone()
  }

  /// Queue a run with the given payload.
  pub async fn run(&self, payload: serde_json::Value) -> Result<(), WorkflowError> {
    self
      .sender
      .send(payload)
      .await
      .map_err(|_| WorkflowError::ChannelClosed {
        workflow: self.workflow.name().to_string(),
      })
  }

  /// Start the execution loop.
  ///
  /// Runs until the cancellation token fires or every sender is dropped.
  /// A failed run is logged and does not stop the loop.
  pub async fn start(mut self, cancel: CancellationToken) -> Result<(), WorkflowError> {
    // Drop our own sender so the loop ends once external senders are gone.
    let (closed, _) = mpsc::channel(1);
    drop(std::mem::replace(&mut self.sender, closed));

    info!(workflow = %self.workflow.name(), "starting workflow runner");

    loop {
      tokio::select! {
        _ = cancel.cancelled() => {
          info!(workflow = %self.workflow.name(), "workflow runner cancelled");
          break;
        }
        payload = self.receiver.recv() => {
          let Some(payload) = payload else {
            info!(workflow = %self.workflow.name(), "workflow runner channel closed");
            break;
          };

          let exec_cancel = cancel.child_token();
          let outcome =
            execute_run(&self.workflow, &self.executor, &self.notifier, payload, exec_cancel).await;
          match outcome {
            Ok(result) => {
              info!(
                workflow = %self.workflow.name(),
                execution_id = %result.execution_id,
                steps_executed = result.step_results.len(),
                "workflow run completed"
              );
            }
            Err(WorkflowError::Cancelled) => {
              info!(workflow = %self.workflow.name(), "workflow run cancelled");
            }
            Err(e) => {
              error!(workflow = %self.workflow.name(), error = %e, "workflow run failed");
            }
          }
        }
      }
    }

    Ok(())
  }

  /// Run the workflow once, outside the loop.
  pub async fn execute_once(
    &self,
    payload: serde_json::Value,
    cancel: CancellationToken,
  ) -> Result<RunResult, WorkflowError> {
    execute_run(&self.workflow, &self.executor, &self.notifier, payload, cancel).await
  }

  pub fn workflow(&self) -> &Workflow {
    &self.workflow
  }
}

async fn execute_run(
  workflow: &Workflow,
  executor: &StepExecutor,
  notifier: &Arc<dyn ExecutionNotifier>,
  payload: serde_json::Value,
  cancel: CancellationToken,
) -> Result<RunResult, WorkflowError> {
  workflow
    .execute(payload, cancel)
    .with_executor(executor.clone())
    .with_notifier(notifier.clone())
    .wait()
    .await
}
