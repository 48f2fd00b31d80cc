//! # Conflict Retry
//!
//! Re-runs an operation that lost an optimistic-concurrency race.
//!
//! ```text
//!   attempt ──► Ok ─────────────────────────────► return
//!      │
//!      ├──► Domain / Store error ───────────────► return (never retried)
//!      │
//!      └──► Conflict ──► attempts left? ──yes──► sleep(backoff) ──► attempt
//!                              │
//!                              no ──────────────► return Conflict
//! ```
//!
//! Every lending operation runs in one transaction, so a retry starts over
//! from a fresh snapshot and re-checks every rule.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{LendingError, LendingResult};

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Total attempts including the first one.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(500),
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        RetryPolicy {
            max_attempts: 1,
            ..Self::default()
        }
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_backoff,
            current_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None, // bounded by max_attempts instead
            ..Default::default()
        }
    }
}

/// Runs `op` until it succeeds, fails for a non-conflict reason, or the
/// policy runs out of attempts.
///
/// ## Example
/// ```rust,ignore
/// let checkout = retry_on_conflict(&policy, || {
///     ledger.open_checkout(&copy_id, &person_id, None, None)
/// })
/// .await?;
/// ```
pub async fn retry_on_conflict<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> LendingResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LendingResult<T>>,
{
    let mut backoff = policy.create_backoff();
    let mut attempt: u32 = 1;

    loop {
        match op().await {
            Err(LendingError::Conflict(reason)) => {
                if attempt >= policy.max_attempts.max(1) {
                    warn!(attempt, reason = %reason, "Conflict retries exhausted");
                    return Err(LendingError::Conflict(reason));
                }

                let wait = backoff.next_backoff().unwrap_or(policy.max_backoff);
                warn!(
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    reason = %reason,
                    "Concurrent update, retrying"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            other => {
                if attempt > 1 {
                    debug!(attempt, "Operation settled after retry");
                }
                return other;
            }
        }
    }
}
