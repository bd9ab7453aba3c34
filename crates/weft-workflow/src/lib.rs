//! Weft Workflow
//!
//! Composition and sequential execution of steps.
//!
//! # Architecture
//!
//! ```text
//! Workflow
//! ├── new(name, trigger_schema)
//! ├── then(step) -> Workflow          (new value, duplicate IDs rejected)
//! └── execute(payload, cancel) -> WorkflowExecution
//!
//! WorkflowExecution
//! └── wait() - trigger validation, then each step via StepExecutor;
//!              first failure aborts the run
//!
//! WorkflowRunner
//! └── start(cancel) - one run per payload received on its channel
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use weft_workflow::Workflow;
//!
//! let workflow = Workflow::new("test", trigger_schema).then(step_one)?.then(step_two)?;
//! let result = workflow.run(json!({ "name": "Ada" }), CancellationToken::new()).await?;
//! ```

mod error;
mod events;
mod execution;
mod runner;
mod workflow;

pub use error::WorkflowError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use execution::{RunResult, WorkflowExecution};
pub use runner::{RunnerConfig, WorkflowRunner};
pub use workflow::Workflow;
