//! teardown-common - Shared types for the teardown orchestrator
//!
//! This crate holds the pieces that have no I/O: resource identifier
//! parsing, the resource kinds that select a removal recipe, and default
//! timings and API versions.
//!
//! ## Modules
//!
//! - [`defaults`]: Default configuration values and pinned API versions
//! - [`resource_id`]: Positional parsing of ARM resource identifiers
//! - [`resource_kind`]: Resource kinds with a dedicated removal recipe

pub mod defaults;
pub mod resource_id;
pub mod resource_kind;

pub use resource_id::{IdError, ResourceId};
pub use resource_kind::{ResourceKind, ResourceType};
