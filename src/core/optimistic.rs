//! Optimistic read-modify-write with bounded retry
//!
//! The ledger store offers conditional writes but no locks. Callers describe
//! one read-modify-write attempt as an async closure; `with_optimistic_update`
//! re-runs it whenever the store reports a write conflict, sleeping with
//! exponential backoff and jitter between attempts, until it succeeds, fails
//! with a non-conflict error, or the attempt budget runs out.

use crate::types::{LoyaltyError, StoreError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Retry budget for optimistic updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Backoff before the second attempt
    pub base_delay: Duration,
    /// Upper bound on any single backoff
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Create a policy, falling back to defaults for zero values
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        let default = Self::default();

        let max_attempts = if max_attempts == 0 {
            tracing::warn!(
                default = default.max_attempts,
                "invalid max_attempts (0), using default"
            );
            default.max_attempts
        } else {
            max_attempts
        };

        Self {
            max_attempts,
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// Backoff before attempt `attempt + 1`, without jitter
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Failure of a single optimistic attempt
#[derive(Debug)]
pub enum AttemptError {
    /// Write lost a race; retry from a fresh read
    Conflict,
    /// Give up and surface this error
    Abort(LoyaltyError),
}

impl From<StoreError> for AttemptError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict { .. } => AttemptError::Conflict,
            other => AttemptError::Abort(other.into()),
        }
    }
}

impl From<LoyaltyError> for AttemptError {
    fn from(error: LoyaltyError) -> Self {
        AttemptError::Abort(error)
    }
}

/// Run `attempt` until it commits, retrying on conflict
///
/// The closure must perform its own read so every retry works from fresh
/// state. `key` is only used for logging and the exhaustion error.
pub async fn with_optimistic_update<T, F, Fut>(
    policy: &RetryPolicy,
    key: &str,
    mut attempt: F,
) -> Result<T, LoyaltyError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    for n in 1..=policy.max_attempts {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(AttemptError::Abort(error)) => return Err(error),
            Err(AttemptError::Conflict) if n < policy.max_attempts => {
                let delay = jittered(policy.backoff(n));
                tracing::debug!(key, attempt = n, ?delay, "write conflict, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(AttemptError::Conflict) => {}
        }
    }

    tracing::warn!(key, attempts = policy.max_attempts, "optimistic update exhausted retries");
    Err(LoyaltyError::retry_exhausted(key, policy.max_attempts))
}

/// Spread retries of contending writers apart
fn jittered(delay: Duration) -> Duration {
    if delay.is_zero() {
        return delay;
    }
    let nanos = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
    let jitter = rand::rng().random_range(0..=nanos / 2);
    delay + Duration::from_nanos(jitter)
}
