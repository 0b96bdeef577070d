//! Teardown orchestration
//!
//! [`Orchestrator::remove`] parses the target, looks up its recipe, sweeps
//! administrative locks and runs the recipe's steps in order.
//!
//! - [`context`]: execution mode, confirmation and per-run state
//! - [`registry`]: the `Recipe` trait and kind → recipe dispatch
//! - [`recipes`]: per-type removal procedures
//! - [`report`]: what was done (or would be done)

pub mod context;
pub mod error;
pub mod recipes;
pub mod registry;
pub mod report;

pub use context::{
    AutoApprove, Confirm, ExecutionMode, RemovalContext, RemovalOptions, StdinConfirm,
    SubscriptionDecommission, Target,
};
pub use error::RemovalError;
pub use registry::{Flow, Recipe, RecipeRegistry};
pub use report::{ActionRecord, ActionStatus, RemovalOutcome, RemovalReport};

use crate::arm::ResourceService;
use crate::clock::{Clock, SystemClock};
use crate::locks::{ArmLockRemover, LockRemover, LockTarget};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Removes resources by type and id
pub struct Orchestrator {
    service: Arc<dyn ResourceService>,
    locks: Arc<dyn LockRemover>,
    clock: Arc<dyn Clock>,
    confirm: Arc<dyn Confirm>,
    registry: RecipeRegistry,
    options: RemovalOptions,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn builder(service: Arc<dyn ResourceService>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(service)
    }

    pub fn options(&self) -> &RemovalOptions {
        &self.options
    }

    /// Remove one resource, or confirm it is already gone.
    ///
    /// Safe to call again after a partial failure: every step re-reads the
    /// state it depends on.
    pub async fn remove(
        &self,
        resource_id: &str,
        resource_type: &str,
    ) -> Result<RemovalReport, RemovalError> {
        let target = Target::parse(resource_id, resource_type)?;
        let recipe = self.registry.recipe_for(&target.resource_type);
        info!(
            resource_id = %target.id,
            resource_type = %target.resource_type,
            recipe = recipe.name(),
            mode = ?self.options.mode,
            "Removing resource"
        );

        let lock_target = LockTarget::for_resource(&target.id, &target.resource_type);
        let skip = recipe.skip_reason(&target, &self.options);
        let mut ctx = RemovalContext::new(
            target,
            recipe.name(),
            self.service.as_ref(),
            self.locks.as_ref(),
            self.clock.as_ref(),
            self.confirm.as_ref(),
            &self.options,
            &self.cancel,
        );

        if let Some(reason) = skip {
            info!(resource_id = %ctx.target.id, reason = %reason, "Skipping");
            return Ok(ctx.finish(Some(RemovalOutcome::Skipped(reason))));
        }

        // A lock that survives this sweep makes the delete below fail, which
        // is where it gets reported.
        match ctx.unlock(&lock_target, "remove locks").await {
            Ok(removed) => ctx.record_locks(removed),
            Err(e @ (RemovalError::Declined { .. } | RemovalError::Cancelled)) => return Err(e),
            Err(e) => ctx.warn(format!("lock removal failed: {}", e)),
        }

        if let Flow::Stop(outcome) = recipe.pre_steps(&mut ctx).await? {
            return Ok(ctx.finish(Some(outcome)));
        }
        recipe.remove_step(&mut ctx).await?;
        recipe.post_wait(&mut ctx).await?;

        let report = ctx.finish(None);
        info!(
            resource_id = %report.resource_id,
            outcome = ?report.outcome,
            actions = report.actions.len(),
            "Removal finished"
        );
        Ok(report)
    }
}

/// Builder for [`Orchestrator`]. Unset collaborators default to the real
/// implementations.
pub struct OrchestratorBuilder {
    service: Arc<dyn ResourceService>,
    locks: Option<Arc<dyn LockRemover>>,
    clock: Arc<dyn Clock>,
    confirm: Option<Arc<dyn Confirm>>,
    registry: Option<RecipeRegistry>,
    options: RemovalOptions,
    cancel: CancellationToken,
}

impl OrchestratorBuilder {
    fn new(service: Arc<dyn ResourceService>) -> Self {
        Self {
            service,
            locks: None,
            clock: Arc::new(SystemClock),
            confirm: None,
            registry: None,
            options: RemovalOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn options(mut self, options: RemovalOptions) -> Self {
        self.options = options;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn confirm(mut self, confirm: Arc<dyn Confirm>) -> Self {
        self.confirm = Some(confirm);
        self
    }

    pub fn lock_remover(mut self, locks: Arc<dyn LockRemover>) -> Self {
        self.locks = Some(locks);
        self
    }

    pub fn registry(mut self, registry: RecipeRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn build(self) -> Orchestrator {
        let locks = self.locks.unwrap_or_else(|| {
            Arc::new(ArmLockRemover::new(
                self.service.clone(),
                self.clock.clone(),
                self.options.lock_poll,
                self.cancel.clone(),
            ))
        });
        let confirm = self.confirm.unwrap_or_else(|| {
            if self.options.force {
                Arc::new(AutoApprove)
            } else {
                Arc::new(StdinConfirm)
            }
        });
        if self.options.mode == ExecutionMode::Execute && !self.options.force {
            warn!("Running without --force: every mutation will ask for confirmation");
        }
        Orchestrator {
            service: self.service,
            locks,
            clock: self.clock,
            confirm,
            registry: self.registry.unwrap_or_default(),
            options: self.options,
            cancel: self.cancel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::{ArmRequest, ArmResponse, ProviderError};
    use crate::clock::ManualClock;
    use crate::locks::{LockError, MockLockRemover};
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Mutex;

    /// Answers provider metadata and accepts every delete
    #[derive(Default)]
    struct AcceptingService {
        requests: Mutex<Vec<ArmRequest>>,
    }

    #[async_trait]
    impl ResourceService for AcceptingService {
        async fn send(&self, request: ArmRequest) -> Result<ArmResponse, ProviderError> {
            let response = if request.path.contains("/providers/Microsoft.Storage")
                && !request.path.contains("storageAccounts")
            {
                ArmResponse::new(
                    200,
                    json!({"resourceTypes": [{"resourceType": "storageAccounts", "apiVersions": ["2023-05-01"]}]}),
                )
            } else {
                ArmResponse::new(200, json!({}))
            };
            self.requests.lock().unwrap().push(request);
            Ok(response)
        }
    }

    const STORAGE_ID: &str =
        "/subscriptions/sub-1/resourceGroups/rg-1/providers/Microsoft.Storage/storageAccounts/st1";

    fn orchestrator(service: Arc<AcceptingService>, locks: MockLockRemover) -> Orchestrator {
        Orchestrator::builder(service)
            .lock_remover(Arc::new(locks))
            .clock(Arc::new(ManualClock::new(Utc::now())))
            .options(RemovalOptions::forced())
            .build()
    }

    #[tokio::test]
    async fn test_lock_failure_does_not_stop_dispatch() {
        let service = Arc::new(AcceptingService::default());
        let mut locks = MockLockRemover::new();
        locks.expect_remove_locks().times(1).returning(|_, _| {
            Err(LockError::Provider(ProviderError::Request {
                status: 403,
                code: "AuthorizationFailed".into(),
                message: "no lock permissions".into(),
            }))
        });

        let report = orchestrator(service.clone(), locks)
            .remove(STORAGE_ID, "Microsoft.Storage/storageAccounts")
            .await
            .unwrap();

        assert_eq!(report.outcome, RemovalOutcome::Removed);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("AuthorizationFailed"));
        let requests = service.requests.lock().unwrap();
        assert!(requests.iter().any(|r| r.method == crate::arm::Method::Delete
            && r.path == STORAGE_ID));
    }

    #[tokio::test]
    async fn test_locks_are_swept_for_the_target_scope() {
        let service = Arc::new(AcceptingService::default());
        let mut locks = MockLockRemover::new();
        locks
            .expect_remove_locks()
            .withf(|target, what_if| {
                matches!(target, LockTarget::Scope(id) if id.as_str() == STORAGE_ID) && !what_if
            })
            .times(1)
            .returning(|_, _| Ok(vec!["/lock-1".to_string()]));

        let report = orchestrator(service, locks)
            .remove(STORAGE_ID, "Microsoft.Storage/storageAccounts")
            .await
            .unwrap();

        assert_eq!(report.locks, vec!["/lock-1".to_string()]);
    }

    struct Decline;

    impl Confirm for Decline {
        fn confirm(&self, _action: &str) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_unconfirmed_locks_are_only_listed() {
        let service = Arc::new(AcceptingService::default());
        let mut locks = MockLockRemover::new();
        locks
            .expect_remove_locks()
            .withf(|_, what_if| *what_if)
            .times(1)
            .returning(|_, _| Ok(vec!["/lock-1".to_string()]));
        locks
            .expect_remove_locks()
            .withf(|_, what_if| !*what_if)
            .times(0);

        let err = Orchestrator::builder(service.clone())
            .lock_remover(Arc::new(locks))
            .clock(Arc::new(ManualClock::new(Utc::now())))
            .confirm(Arc::new(Decline))
            .build()
            .remove(STORAGE_ID, "Microsoft.Storage/storageAccounts")
            .await
            .unwrap_err();

        match err {
            RemovalError::Declined { step, .. } => assert!(step.starts_with("remove 1 lock(s)")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(service.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_skipped_types_never_touch_locks() {
        let service = Arc::new(AcceptingService::default());
        let mut locks = MockLockRemover::new();
        locks.expect_remove_locks().times(0);

        let report = orchestrator(service.clone(), locks)
            .remove(
                "/subscriptions/sub-1/resourceGroups/rg-1/providers/Microsoft.KeyVault/vaults/kv/keys/k1",
                "Microsoft.KeyVault/vaults/keys",
            )
            .await
            .unwrap();

        assert!(matches!(report.outcome, RemovalOutcome::Skipped(_)));
        assert!(service.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_id_is_rejected() {
        let service = Arc::new(AcceptingService::default());
        let mut locks = MockLockRemover::new();
        locks.expect_remove_locks().times(0);

        let err = orchestrator(service, locks)
            .remove("not-an-id", "Microsoft.Storage/storageAccounts")
            .await
            .unwrap_err();
        assert!(matches!(err, RemovalError::InvalidId(_)));
    }
}
