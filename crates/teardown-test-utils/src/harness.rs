use crate::arm::FakeArm;
use crate::confirm::RecordingConfirm;
use crate::fixtures::start_time;
use std::sync::Arc;
use teardown::clock::ManualClock;
use teardown::orchestrator::{Orchestrator, RemovalError, RemovalOptions, RemovalReport};

/// Orchestrator wired to a scripted ARM, a manual clock and a recording confirmer
pub struct Harness {
    pub arm: Arc<FakeArm>,
    pub clock: Arc<ManualClock>,
    pub confirm: Arc<RecordingConfirm>,
    pub orchestrator: Orchestrator,
}

impl Harness {
    pub fn new(options: RemovalOptions) -> Self {
        Self::with_confirm(options, RecordingConfirm::approving())
    }

    /// Execute mode, no prompts
    pub fn forced() -> Self {
        Self::new(RemovalOptions::forced())
    }

    pub fn what_if() -> Self {
        Self::new(RemovalOptions::what_if())
    }

    pub fn with_confirm(options: RemovalOptions, confirm: RecordingConfirm) -> Self {
        let arm = Arc::new(FakeArm::new());
        let clock = Arc::new(ManualClock::new(start_time()));
        let confirm = Arc::new(confirm);
        let orchestrator = Orchestrator::builder(arm.clone())
            .clock(clock.clone())
            .confirm(confirm.clone())
            .options(options)
            .build();
        Self {
            arm,
            clock,
            confirm,
            orchestrator,
        }
    }

    pub async fn remove(
        &self,
        resource_id: &str,
        resource_type: &str,
    ) -> Result<RemovalReport, RemovalError> {
        self.orchestrator.remove(resource_id, resource_type).await
    }
}
