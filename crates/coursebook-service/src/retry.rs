//! Bounded retry for optimistic-concurrency writes.
//!
//! [`retry_conditional`] runs an operation that reads the current version
//! and attempts a conditional write. Version conflicts are retried with
//! exponential backoff and jitter until the attempt budget or the total
//! wait budget runs out. Any other failure ends the loop at once.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tracing::debug;

use coursebook_core::config::reservation::RetryConfig;
use coursebook_database::StoreError;

/// Classifies failures that a fresh read may resolve.
pub trait Contended {
    /// Whether the failure came from losing a compare-and-swap race.
    fn is_conflict(&self) -> bool;
}

impl Contended for StoreError {
    fn is_conflict(&self) -> bool {
        StoreError::is_conflict(self)
    }
}

/// Why [`retry_conditional`] gave up.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt lost to contention.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// The last conflict observed.
        last: E,
    },
    /// A non-conflict failure; no further attempts were made.
    #[error(transparent)]
    Aborted(E),
}

/// Exponential backoff with jitter, bounded by attempts and total wait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    max_total_wait: Duration,
    backoff_multiplier: f64,
}

impl RetryPolicy {
    /// A policy with `max_attempts` and the default delays.
    pub fn new(max_attempts: u32) -> Self {
        Self::from(&RetryConfig {
            max_attempts,
            ..RetryConfig::default()
        })
    }

    /// Retry immediately, without sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_total_wait: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Maximum attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the given failed attempt (1-based):
    /// `min(initial * 2^(attempt-1), max) * uniform(0.5, 1.0)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if self.max_delay.is_zero() || self.initial_delay.is_zero() {
            return Duration::ZERO;
        }
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let base = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());
        let jitter = rand::rng().random_range(0.5..=1.0);
        Duration::from_secs_f64(capped * jitter)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: config.initial_backoff(),
            max_delay: config.max_backoff(),
            max_total_wait: config.max_total_wait(),
            backoff_multiplier: 2.0,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

/// Run `op` until it succeeds, fails with a non-conflict error, or the
/// policy's budget is spent. `op` receives the 1-based attempt number and
/// must read the current version itself on every call.
pub async fn retry_conditional<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    E: Contended + std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut waited = Duration::ZERO;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let err = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_conflict() => err,
            Err(err) => return Err(RetryError::Aborted(err)),
        };

        if attempt >= policy.max_attempts {
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last: err,
            });
        }

        let remaining = policy.max_total_wait.saturating_sub(waited);
        let delay = policy.delay_for_attempt(attempt).min(remaining);
        debug!(attempt, delay_ms = delay.as_millis() as u64, conflict = %err, "Conditional write lost a race, retrying");
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
            waited += delay;
        }
    }
}
