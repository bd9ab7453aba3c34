//! Weft Step
//!
//! Steps are the units of work weft composes. Every step declares an input
//! and an output [`Schema`](weft_schema::Schema); [`StepExecutor`] enforces
//! both around the step body:
//!
//! ```text
//! raw input ──► input schema ──► Execute::execute ──► output schema ──► StepResult
//!                   │                    │                   │
//!                   ▼                    ▼                   ▼
//!          Validation{Input}     Execution / Timeout   Validation{Output}
//! ```
//!
//! [`Capability`] wraps a step with a description and a kind (sync or tool)
//! so integrations can advertise it.

mod capability;
mod error;
mod execute;
mod executor;
mod step;

pub use capability::{Capability, CapabilityKind};
pub use error::{BoxError, Stage, StepError};
pub use execute::{Execute, ExecuteFn, StepContext, Typed, execute_fn, typed};
pub use executor::{StepExecutor, StepInput, StepResult};
pub use step::Step;
