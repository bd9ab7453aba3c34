//! Weft Integration
//!
//! An integration bundles the capabilities one external system offers:
//!
//! - **syncs**, registered by id
//! - **workflows**, registered by name
//! - **static tools**, fixed when the integration is built
//! - **dynamic tools**, resolved per call from caller-supplied [`ToolParams`]
//!
//! Implementors of [`Integration`] own a [`Registry`] and get lookup,
//! invocation and discovery ([`discover`]) for free.

mod catalog;
mod error;
mod integration;
mod provider;
mod registry;

pub use catalog::{CapabilityEntry, Catalog, WorkflowEntry, discover};
pub use error::{EntryKind, IntegrationError};
pub use integration::Integration;
pub use provider::{ToolParams, ToolProvider, ToolProviderFn, tool_provider_fn};
pub use registry::{Registry, ToolMap};
