//! Azure Resource Manager access
//!
//! - [`service`]: the `ResourceService` trait and its typed operations
//! - [`client`]: reqwest-backed implementation
//! - [`error`]: provider error classification
//! - [`request`]: raw request / response types
//! - [`types`]: typed payloads read by recipes
//! - [`token`]: bearer token acquisition

pub mod client;
pub mod error;
pub mod request;
pub mod service;
pub mod token;
pub mod types;

pub use client::{ArmClient, ThrottleRetry};
pub use error::{ProviderError, classify_response};
pub use request::{ArmRequest, ArmResponse, Method};
pub use service::ResourceService;
pub use token::TokenSource;
