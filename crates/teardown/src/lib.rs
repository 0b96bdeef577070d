//! Typed teardown orchestrator for Azure Resource Manager resources
//!
//! Given a resource id and type, runs the removal recipe that type needs:
//! pre-removal mutations, polling for provider-side transitions and the
//! final delete.

pub mod arm;
pub mod clock;
pub mod config;
pub mod locks;
pub mod orchestrator;
pub mod wait;

pub use orchestrator::{Orchestrator, RemovalError, RemovalOptions, RemovalReport};
