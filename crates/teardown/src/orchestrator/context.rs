//! Per-invocation removal state threaded through every recipe step

use super::error::RemovalError;
use super::report::{ActionRecord, ActionStatus, RemovalOutcome, RemovalReport};
use crate::arm::types::{Completion, OperationState};
use crate::arm::{ProviderError, ResourceService};
use crate::clock::Clock;
use crate::locks::{LockError, LockRemover, LockTarget};
use crate::wait::{Poll, PollOutcome, RetryPolicy, poll_until, sleep_cancellable};
use std::future::Future;
use std::io::{BufRead, Write};
use std::time::Duration;
use teardown_common::defaults::{
    DEFAULT_DECOMMISSION_MANAGEMENT_GROUP, DEFAULT_SUBSCRIPTION_GUARD,
    NETWORK_WATCHER_RESOURCE_GROUP, REPLICATION_COOLDOWN, SCHEDULE_REQUEST_COOLDOWN,
};
use teardown_common::{ResourceId, ResourceKind, ResourceType};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Whether mutations are carried out or only planned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    #[default]
    Execute,
    /// Read, plan and report; never mutate or wait
    WhatIf,
}

/// Settings for decommissioning test-fixture subscriptions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionDecommission {
    /// Alias names must contain this substring to be touched at all
    pub name_guard: String,
    pub management_group: String,
    /// Resource group the platform creates in every subscription
    pub network_watcher_group: String,
}

impl Default for SubscriptionDecommission {
    fn default() -> Self {
        Self {
            name_guard: DEFAULT_SUBSCRIPTION_GUARD.to_string(),
            management_group: DEFAULT_DECOMMISSION_MANAGEMENT_GROUP.to_string(),
            network_watcher_group: NETWORK_WATCHER_RESOURCE_GROUP.to_string(),
        }
    }
}

/// Options for a removal run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalOptions {
    pub mode: ExecutionMode,
    /// Skip confirmation prompts
    pub force: bool,
    /// Budget for provider-side state transitions
    pub poll: RetryPolicy,
    /// Budget for removed locks to stop applying
    pub lock_poll: RetryPolicy,
    /// Minimum age of workspace replication before it may be disabled
    pub replication_cooldown: Duration,
    /// Fixed wait before a schedule request may be revoked
    pub schedule_request_cooldown: Duration,
    pub subscription: SubscriptionDecommission,
}

impl Default for RemovalOptions {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Execute,
            force: false,
            poll: RetryPolicy::provider(),
            lock_poll: RetryPolicy::lock_release(),
            replication_cooldown: REPLICATION_COOLDOWN,
            schedule_request_cooldown: SCHEDULE_REQUEST_COOLDOWN,
            subscription: SubscriptionDecommission::default(),
        }
    }
}

impl RemovalOptions {
    pub fn what_if() -> Self {
        Self {
            mode: ExecutionMode::WhatIf,
            ..Self::default()
        }
    }

    pub fn forced() -> Self {
        Self {
            force: true,
            ..Self::default()
        }
    }
}

/// Asks the operator whether a mutating step may proceed
pub trait Confirm: Send + Sync {
    fn confirm(&self, action: &str) -> bool;
}

/// Approves every step
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

impl Confirm for AutoApprove {
    fn confirm(&self, _action: &str) -> bool {
        true
    }
}

/// Prompts on the terminal; anything other than `y`/`yes` declines
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, action: &str) -> bool {
        blocking_io(|| {
            ask(
                &mut std::io::stdin().lock(),
                &mut std::io::stderr().lock(),
                action,
            )
        })
    }
}

/// Write the prompt, read one line; I/O errors decline
fn ask(input: &mut impl BufRead, output: &mut impl Write, action: &str) -> bool {
    if write!(output, "{}? [y/N] ", action)
        .and_then(|_| output.flush())
        .is_err()
    {
        return false;
    }
    let mut answer = String::new();
    if input.read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Run blocking terminal I/O without stalling other tasks on a multi-thread runtime
fn blocking_io<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Resource being removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: ResourceId,
    pub resource_type: ResourceType,
}

impl Target {
    pub fn parse(resource_id: &str, resource_type: &str) -> Result<Self, RemovalError> {
        Ok(Self {
            id: ResourceId::parse(resource_id)?,
            resource_type: ResourceType::parse(resource_type),
        })
    }

    pub fn kind(&self) -> Option<ResourceKind> {
        self.resource_type.kind()
    }

    /// Map a provider error of `step` into a [`RemovalError`] naming this target
    pub fn fail(&self, step: &str) -> impl FnOnce(ProviderError) -> RemovalError + use<> {
        let resource_id = self.id.to_string();
        let resource_type = self.resource_type.to_string();
        let step = step.to_string();
        move |source| RemovalError::Step {
            resource_id,
            resource_type,
            step,
            source,
        }
    }

    /// A precondition the provider's answer did not meet
    pub fn precondition(&self, step: &str, reason: impl Into<String>) -> RemovalError {
        RemovalError::Precondition {
            resource_id: self.id.to_string(),
            resource_type: self.resource_type.to_string(),
            step: step.to_string(),
            reason: reason.into(),
        }
    }
}

/// State carried through one removal: collaborators, options and the report
pub struct RemovalContext<'a> {
    pub target: Target,
    pub service: &'a dyn ResourceService,
    pub locks: &'a dyn LockRemover,
    pub clock: &'a dyn Clock,
    pub options: &'a RemovalOptions,
    pub cancel: &'a CancellationToken,
    confirm: &'a dyn Confirm,
    report: RemovalReport,
    outcome: Option<RemovalOutcome>,
}

impl<'a> RemovalContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        target: Target,
        recipe: &'static str,
        service: &'a dyn ResourceService,
        locks: &'a dyn LockRemover,
        clock: &'a dyn Clock,
        confirm: &'a dyn Confirm,
        options: &'a RemovalOptions,
        cancel: &'a CancellationToken,
    ) -> Self {
        let report = RemovalReport::new(
            target.id.as_str(),
            target.resource_type.as_str(),
            recipe,
        );
        Self {
            target,
            service,
            locks,
            clock,
            options,
            cancel,
            confirm,
            report,
            outcome: None,
        }
    }

    pub fn what_if(&self) -> bool {
        self.options.mode == ExecutionMode::WhatIf
    }

    /// Gate a mutating step.
    ///
    /// Returns `Ok(true)` when the step should run, `Ok(false)` in what-if mode
    /// (the step is recorded as planned) and `Err(Declined)` when the operator
    /// says no.
    pub fn proceed(&mut self, action: impl Into<String>) -> Result<bool, RemovalError> {
        let action = action.into();
        if self.what_if() {
            info!(resource_id = %self.target.id, "[WHAT IF] Would {}", action);
            self.record(action, ActionStatus::Planned);
            return Ok(false);
        }

        if !self.options.force && !self.confirm.confirm(&action) {
            warn!(resource_id = %self.target.id, action = %action, "Step declined");
            return Err(RemovalError::Declined {
                resource_id: self.target.id.to_string(),
                resource_type: self.target.resource_type.to_string(),
                step: action,
            });
        }

        info!(resource_id = %self.target.id, "{}", action);
        self.record(action, ActionStatus::Performed);
        Ok(true)
    }

    /// Remove the locks on `target`. Without `force` the locks found are
    /// confirmed first; in what-if mode they are only listed.
    pub async fn unlock(
        &mut self,
        target: &LockTarget,
        step: &str,
    ) -> Result<Vec<String>, RemovalError> {
        let what_if = self.what_if();
        if !what_if && !self.options.force {
            let found = self
                .locks
                .remove_locks(target, true)
                .await
                .map_err(|e| lock_failure(&self.target, step, e))?;
            if found.is_empty() {
                return Ok(found);
            }
            self.proceed(format!(
                "remove {} lock(s) on '{}'",
                found.len(),
                target.id()
            ))?;
        }
        self.locks
            .remove_locks(target, what_if)
            .await
            .map_err(|e| lock_failure(&self.target, step, e))
    }

    /// Fixed wait; recorded instead of slept in what-if mode
    pub async fn wait(&mut self, duration: Duration, reason: &str) -> Result<(), RemovalError> {
        if duration.is_zero() {
            return Ok(());
        }
        if self.what_if() {
            info!(
                resource_id = %self.target.id,
                wait_secs = duration.as_secs(),
                "[WHAT IF] Would wait: {}", reason
            );
            self.record(
                format!("wait {}s: {}", duration.as_secs(), reason),
                ActionStatus::Planned,
            );
            return Ok(());
        }
        info!(
            resource_id = %self.target.id,
            wait_secs = duration.as_secs(),
            "Waiting: {}", reason
        );
        sleep_cancellable(self.clock, self.cancel, duration).await?;
        Ok(())
    }

    /// Poll until ready or exhausted; recorded instead of run in what-if mode
    /// (reported as ready after zero attempts).
    pub async fn poll<F, Fut>(
        &mut self,
        policy: &RetryPolicy,
        description: &str,
        check: F,
    ) -> Result<PollOutcome, RemovalError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<Poll, RemovalError>>,
    {
        if self.what_if() {
            info!(resource_id = %self.target.id, "[WHAT IF] Would poll: {}", description);
            self.record(format!("poll: {}", description), ActionStatus::Planned);
            return Ok(PollOutcome::Ready { attempts: 0 });
        }
        let name = self.target.id.to_string();
        poll_until(policy, self.clock, self.cancel, &name, check).await
    }

    /// Wait until a step the provider accepted asynchronously has finished.
    ///
    /// Exhausting the budget is fatal: the next step in the sequence would be
    /// refused while this one is still running.
    pub async fn await_completion(
        &mut self,
        completion: Completion,
        step: &str,
    ) -> Result<(), RemovalError> {
        let Completion::Accepted(operation) = completion else {
            return Ok(());
        };
        let service = self.service;
        let snapshot = self.target.clone();
        let target = &snapshot;
        let operation = operation.as_str();
        let policy = self.options.poll;
        let outcome = self
            .poll(&policy, &format!("{} to finish", step), |_| async move {
                let state = service
                    .operation_state(operation)
                    .await
                    .map_err(target.fail(step))?;
                Ok(match state {
                    OperationState::Succeeded => Poll::Ready,
                    OperationState::Running => Poll::Pending,
                })
            })
            .await?;

        if let PollOutcome::Exhausted { attempts } = outcome {
            return Err(self.target.precondition(
                step,
                format!("operation still running after {} checks", attempts),
            ));
        }
        Ok(())
    }

    /// Record a non-fatal problem
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(resource_id = %self.target.id, "{}", message);
        self.report.warnings.push(message);
    }

    pub fn set_outcome(&mut self, outcome: RemovalOutcome) {
        self.outcome = Some(outcome);
    }

    /// True once a step found the resource already gone
    pub fn already_absent(&self) -> bool {
        self.outcome == Some(RemovalOutcome::AlreadyAbsent)
    }

    pub fn record_locks(&mut self, lock_ids: Vec<String>) {
        for id in lock_ids {
            if !self.report.locks.contains(&id) {
                self.report.locks.push(id);
            }
        }
    }

    pub fn removed_locks(&self) -> &[String] {
        &self.report.locks
    }

    /// Close the report. What-if runs always end as planned unless skipped.
    pub fn finish(mut self, outcome: Option<RemovalOutcome>) -> RemovalReport {
        let outcome = outcome
            .or(self.outcome.take())
            .unwrap_or(RemovalOutcome::Removed);
        self.report.outcome = match outcome {
            RemovalOutcome::Skipped(_) => outcome,
            _ if self.what_if() => RemovalOutcome::Planned,
            _ => outcome,
        };
        self.report
    }

    fn record(&mut self, description: String, status: ActionStatus) {
        self.report.actions.push(ActionRecord {
            description,
            status,
        });
    }
}

fn lock_failure(target: &Target, step: &str, error: LockError) -> RemovalError {
    match error {
        LockError::Provider(source) => target.fail(step)(source),
        LockError::Cancelled(_) => RemovalError::Cancelled,
    }
}
