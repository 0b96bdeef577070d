//! Removal errors

use crate::arm::ProviderError;
use crate::wait::Cancelled;
use teardown_common::IdError;
use thiserror::Error;

/// Failure of a removal recipe.
///
/// Every variant raised while a recipe runs names the resource, its type and
/// the step that failed, so the removal can be retried by hand.
#[derive(Debug, Error)]
pub enum RemovalError {
    #[error("invalid resource id: {0}")]
    InvalidId(#[from] IdError),

    /// A provider call failed; the provider's code and message are kept verbatim
    #[error("{resource_type} '{resource_id}': {step} failed: {source}")]
    Step {
        resource_id: String,
        resource_type: String,
        step: String,
        #[source]
        source: ProviderError,
    },

    /// The provider returned something the recipe cannot act on
    #[error("{resource_type} '{resource_id}': {step}: {reason}")]
    Precondition {
        resource_id: String,
        resource_type: String,
        step: String,
        reason: String,
    },

    /// The operator declined a confirmation prompt
    #[error("{resource_type} '{resource_id}': '{step}' declined")]
    Declined {
        resource_id: String,
        resource_type: String,
        step: String,
    },

    #[error("removal cancelled")]
    Cancelled,
}

impl From<Cancelled> for RemovalError {
    fn from(_: Cancelled) -> Self {
        RemovalError::Cancelled
    }
}

impl RemovalError {
    /// Underlying provider error, if any
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            RemovalError::Step { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Name of the failing step, if the error came from a recipe step
    pub fn step(&self) -> Option<&str> {
        match self {
            RemovalError::Step { step, .. }
            | RemovalError::Precondition { step, .. }
            | RemovalError::Declined { step, .. } => Some(step),
            _ => None,
        }
    }
}
