//! Administrative lock removal
//!
//! Runs before every recipe. Locks are deleted, then the scope is polled until
//! the provider stops reporting them, since lock deletion is eventually
//! consistent and a delete issued too early still fails with `ScopeLocked`.

use crate::arm::{ProviderError, ResourceService};
use crate::clock::Clock;
use crate::wait::{Cancelled, Poll, PollOutcome, RetryPolicy, poll_until};
use async_trait::async_trait;
use std::sync::Arc;
use teardown_common::defaults::api_versions;
use teardown_common::{ResourceId, ResourceKind, ResourceType};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What to unlock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockTarget {
    /// Every lock applying to a resource scope
    Scope(ResourceId),
    /// One lock, addressed by its own id
    Lock(ResourceId),
}

impl LockTarget {
    /// Lock resources are removed directly; anything else by scope
    pub fn for_resource(resource_id: &ResourceId, resource_type: &ResourceType) -> Self {
        if resource_type.kind() == Some(ResourceKind::ManagementLock) {
            LockTarget::Lock(resource_id.clone())
        } else {
            LockTarget::Scope(resource_id.clone())
        }
    }

    pub fn id(&self) -> &ResourceId {
        match self {
            LockTarget::Scope(id) | LockTarget::Lock(id) => id,
        }
    }
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Removes administrative locks
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LockRemover: Send + Sync {
    /// Remove the targeted locks, returning their ids.
    ///
    /// With `what_if` the locks are only listed.
    async fn remove_locks(
        &self,
        target: &LockTarget,
        what_if: bool,
    ) -> Result<Vec<String>, LockError>;
}

/// [`LockRemover`] backed by the locks REST API
pub struct ArmLockRemover {
    service: Arc<dyn ResourceService>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl ArmLockRemover {
    pub fn new(
        service: Arc<dyn ResourceService>,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            service,
            clock,
            policy,
            cancel,
        }
    }

    /// Ids of the locks still in place for a target
    async fn current_locks(&self, target: &LockTarget) -> Result<Vec<String>, ProviderError> {
        match target {
            LockTarget::Scope(scope) => Ok(self
                .service
                .list_locks(scope)
                .await?
                .into_iter()
                .map(|lock| lock.id)
                .collect()),
            LockTarget::Lock(lock_id) => Ok(self
                .service
                .get_resource(lock_id.as_str(), api_versions::LOCKS)
                .await?
                .map(|_| vec![lock_id.to_string()])
                .unwrap_or_default()),
        }
    }
}

#[async_trait]
impl LockRemover for ArmLockRemover {
    async fn remove_locks(
        &self,
        target: &LockTarget,
        what_if: bool,
    ) -> Result<Vec<String>, LockError> {
        let locks = self.current_locks(target).await?;
        if locks.is_empty() {
            debug!(resource_id = %target.id(), "No locks to remove");
            return Ok(locks);
        }

        if what_if {
            for lock in &locks {
                info!(resource_id = %target.id(), lock_id = %lock, "[WHAT IF] Would remove lock");
            }
            return Ok(locks);
        }

        for lock in &locks {
            info!(resource_id = %target.id(), lock_id = %lock, "Removing lock");
            self.service.delete_lock(lock).await?;
        }

        let this = self;
        let outcome = poll_until::<_, _, LockError>(
            &self.policy,
            self.clock.as_ref(),
            &self.cancel,
            target.id().as_str(),
            |_| async move {
                let remaining = this.current_locks(target).await?;
                Ok(if remaining.is_empty() {
                    Poll::Ready
                } else {
                    Poll::Pending
                })
            },
        )
        .await?;

        if let PollOutcome::Exhausted { attempts } = outcome {
            warn!(
                resource_id = %target.id(),
                attempts,
                "Locks still reported after removal, continuing"
            );
        }

        Ok(locks)
    }
}
