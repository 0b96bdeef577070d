//! Fixed-interval polling with cancellation support.
//!
//! Provides the poll primitive shared by every recipe that waits on a
//! provider-side state transition. The interval and attempt ceiling come from
//! an explicit [`RetryPolicy`] so tests can shrink or replay them.

use crate::clock::Clock;
use std::future::Future;
use std::time::Duration;
use teardown_common::defaults::{
    DEFAULT_LOCK_POLL_INTERVAL, DEFAULT_LOCK_POLL_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL,
    DEFAULT_POLL_MAX_ATTEMPTS,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Interval and attempt ceiling for one poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay between checks
    pub interval: Duration,
    /// Maximum number of checks
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Budget used for asynchronous provider deletes and state transitions
    pub const fn provider() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_POLL_MAX_ATTEMPTS)
    }

    /// Budget used while waiting for removed locks to stop applying
    pub const fn lock_release() -> Self {
        Self::new(DEFAULT_LOCK_POLL_INTERVAL, DEFAULT_LOCK_POLL_MAX_ATTEMPTS)
    }

    /// Longest time the loop can sleep in total
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::provider()
    }
}

/// Result of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// Target state reached
    Ready,
    /// Not yet, keep waiting
    Pending,
}

/// How a poll loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Ready { attempts: u32 },
    /// Attempt ceiling reached without the target state
    Exhausted { attempts: u32 },
}

/// A wait was interrupted through its cancellation token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("wait cancelled")]
pub struct Cancelled;

/// Sleep on `clock`, returning early if `cancel` fires.
pub async fn sleep_cancellable(
    clock: &dyn Clock,
    cancel: &CancellationToken,
    duration: Duration,
) -> Result<(), Cancelled> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Cancelled),
        _ = clock.sleep(duration) => Ok(()),
    }
}

/// Poll `check` until it reports [`Poll::Ready`] or the policy is exhausted.
///
/// # Arguments
/// * `policy` - Interval and attempt ceiling
/// * `clock` - Clock used for sleeping between checks
/// * `cancel` - Checked before each attempt and raced against each sleep
/// * `resource_name` - Name for logging
/// * `check` - Called with the 1-based attempt number
///
/// # Returns
/// * `Ok(PollOutcome::Ready)` - Target state observed
/// * `Ok(PollOutcome::Exhausted)` - Ceiling reached; the caller decides whether that is fatal
/// * `Err` - Cancelled, or `check` returned an error (fatal client error)
pub async fn poll_until<F, Fut, E>(
    policy: &RetryPolicy,
    clock: &dyn Clock,
    cancel: &CancellationToken,
    resource_name: &str,
    mut check: F,
) -> Result<PollOutcome, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Poll, E>>,
    E: From<Cancelled>,
{
    for attempt in 1..=policy.max_attempts {
        if cancel.is_cancelled() {
            return Err(Cancelled.into());
        }

        match check(attempt).await? {
            Poll::Ready => {
                debug!(resource = %resource_name, attempts = attempt, "Target state reached");
                return Ok(PollOutcome::Ready { attempts: attempt });
            }
            Poll::Pending if attempt < policy.max_attempts => {
                debug!(
                    resource = %resource_name,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_secs = policy.interval.as_secs(),
                    "Not ready, retrying"
                );
                sleep_cancellable(clock, cancel, policy.interval).await?;
            }
            Poll::Pending => {}
        }
    }

    Ok(PollOutcome::Exhausted {
        attempts: policy.max_attempts,
    })
}
