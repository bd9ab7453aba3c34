//! Execution events and notifiers.
//!
//! A run moves strictly forward: started, then each step in order, then
//! exactly one of completed, failed or cancelled. Every transition is
//! reported to the run's [`ExecutionNotifier`].

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during a workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
  WorkflowStarted {
    execution_id: String,
    workflow: String,
  },

  StepStarted {
    execution_id: String,
    step_id: String,
    index: usize,
  },

  StepCompleted {
    execution_id: String,
    step_id: String,
    index: usize,
    output: serde_json::Value,
  },

  StepFailed {
    execution_id: String,
    step_id: String,
    index: usize,
    error: String,
  },

  WorkflowCompleted {
    execution_id: String,
    output: serde_json::Value,
  },

  WorkflowFailed { execution_id: String, error: String },

  WorkflowCancelled { execution_id: String },
}

impl ExecutionEvent {
  /// Whether this event ends a run.
  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      ExecutionEvent::WorkflowCompleted { .. }
        | ExecutionEvent::WorkflowFailed { .. }
        | ExecutionEvent::WorkflowCancelled { .. }
    )
  }
}

/// Receives execution events.
///
/// Implementations decide what to do with them (persist, stream, ignore).
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// Forwards events to an unbounded channel.
///
/// Unbounded so a slow consumer never stalls a run; volume is a handful of
/// events per step.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }

  /// Create a notifier together with the receiving end.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped.
    let _ = self.sender.send(event);
  }
}
