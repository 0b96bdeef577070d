//! Shared test utilities for the teardown orchestrator
//!
//! ## Modules
//!
//! - [`arm`]: scripted in-memory Resource Manager that records every request
//! - [`confirm`]: confirmation double that records prompts
//! - [`fixtures`]: resource ids, canned responses and a fixed start time
//! - [`harness`]: an orchestrator wired to all of the above

pub mod arm;
pub mod confirm;
pub mod fixtures;
pub mod harness;

pub use arm::FakeArm;
pub use confirm::RecordingConfirm;
pub use harness::Harness;
