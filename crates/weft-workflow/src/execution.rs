//! Workflow execution.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use weft_step::{StepError, StepExecutor, StepInput, StepResult};

use crate::error::WorkflowError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::workflow::Workflow;

/// Result of a successful workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
  /// Unique execution ID.
  pub execution_id: String,
  /// Name of the workflow that ran.
  pub workflow: String,
  /// Validated output of the last step.
  pub output: serde_json::Value,
  /// Results of every step, in execution order.
  pub step_results: Vec<StepResult>,
}

/// A handle to a single workflow run.
///
/// Call `.wait()` to run the execution and get the result.
pub struct WorkflowExecution<'a> {
  workflow: &'a Workflow,
  execution_id: String,
  payload: serde_json::Value,
  cancel: CancellationToken,
  executor: StepExecutor,
  notifier: Arc<dyn ExecutionNotifier>,
}

impl<'a> WorkflowExecution<'a> {
  pub(crate) fn new(
    workflow: &'a Workflow,
    execution_id: String,
    payload: serde_json::Value,
    cancel: CancellationToken,
  ) -> Self {
    Self {
      workflow,
      execution_id,
      payload,
      cancel,
      executor: StepExecutor::new(),
      notifier: Arc::new(NoopNotifier),
    }
  }

  /// Report this run's events to `notifier`.
  pub fn with_notifier(mut self, notifier: Arc<dyn ExecutionNotifier>) -> Self {
    self.notifier = notifier;
    self
  }

  /// Use a configured step executor (e.g. with a default step timeout).
  pub fn with_executor(mut self, executor: StepExecutor) -> Self {
    self.executor = executor;
    self
  }

  pub fn execution_id(&self) -> &str {
    &self.execution_id
  }

  /// Run the workflow to completion.
  #[instrument(
    name = "workflow_execute",
    skip(self),
    fields(
      workflow = %self.workflow.name(),
      execution_id = %self.execution_id,
    )
  )]
  pub async fn wait(self) -> Result<RunResult, WorkflowError> {
    info!(trigger_payload = %self.payload, "workflow_started");
    self.notifier.notify(ExecutionEvent::WorkflowStarted {
      execution_id: self.execution_id.clone(),
      workflow: self.workflow.name().to_string(),
    });

    let result = match self.workflow.timeout_ms() {
      Some(timeout_ms) => {
        match tokio::time::timeout(Duration::from_millis(timeout_ms), self.run_steps()).await {
          Ok(result) => result,
          Err(_) => Err(WorkflowError::Timeout {
            workflow: self.workflow.name().to_string(),
            timeout_ms,
          }),
        }
      }
      None => self.run_steps().await,
    };

    match &result {
      Ok(run) => {
        info!(output = %run.output, "workflow_completed");
        self.notifier.notify(ExecutionEvent::WorkflowCompleted {
          execution_id: self.execution_id.clone(),
          output: run.output.clone(),
        });
      }
      Err(WorkflowError::Cancelled) => {
        warn!("workflow_cancelled");
        self.notifier.notify(ExecutionEvent::WorkflowCancelled {
          execution_id: self.execution_id.clone(),
        });
      }
      Err(e) => {
        error!(error = %e, "workflow_failed");
        self.notifier.notify(ExecutionEvent::WorkflowFailed {
          execution_id: self.execution_id.clone(),
          error: e.to_string(),
        });
      }
    }

    result
  }

  /// Validate the trigger and run each step in order, stopping at the first failure.
  async fn run_steps(&self) -> Result<RunResult, WorkflowError> {
    if self.workflow.is_empty() {
      return Err(WorkflowError::EmptyWorkflow {
        workflow: self.workflow.name().to_string(),
      });
    }

    if self.cancel.is_cancelled() {
      return Err(WorkflowError::Cancelled);
    }

    let trigger = self
      .workflow
      .trigger_schema()
      .validate(&self.payload)
      .map_err(|details| WorkflowError::Trigger {
        workflow: self.workflow.name().to_string(),
        details,
      })?;
    let trigger = Arc::new(trigger);

    let mut current = trigger.as_ref().clone();
    let mut step_results = Vec::with_capacity(self.workflow.len());

    for (index, step) in self.workflow.steps().iter().enumerate() {
      if self.cancel.is_cancelled() {
        warn!(step_id = %step.id(), "workflow cancelled before step");
        return Err(WorkflowError::Cancelled);
      }

      self.notifier.notify(ExecutionEvent::StepStarted {
        execution_id: self.execution_id.clone(),
        step_id: step.id().to_string(),
        index,
      });

      let input = StepInput {
        execution_id: self.execution_id.clone(),
        trigger: trigger.clone(),
        input: current,
      };

      match self.executor.execute(step, input, self.cancel.clone()).await {
        Ok(step_result) => {
          self.notifier.notify(ExecutionEvent::StepCompleted {
            execution_id: self.execution_id.clone(),
            step_id: step.id().to_string(),
            index,
            output: step_result.output.clone(),
          });
          current = step_result.output.clone();
          step_results.push(step_result);
        }
        Err(StepError::Cancelled) => return Err(WorkflowError::Cancelled),
        Err(source) => {
          self.notifier.notify(ExecutionEvent::StepFailed {
            execution_id: self.execution_id.clone(),
            step_id: step.id().to_string(),
            index,
            error: source.to_string(),
          });
          return Err(WorkflowError::Step {
            workflow: self.workflow.name().to_string(),
            index,
            step_id: step.id().to_string(),
            source,
          });
        }
      }
    }

    Ok(RunResult {
      execution_id: self.execution_id.clone(),
      workflow: self.workflow.name().to_string(),
      output: current,
      step_results,
    })
  }
}
