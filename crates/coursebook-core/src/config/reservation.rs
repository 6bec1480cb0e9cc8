//! Retry budgets for optimistic-concurrency writes.
//!
//! Reserving a seat, releasing a seat, and transitioning a booking record
//! each get their own budget. A budget bounds both the number of attempts
//! and the total time spent sleeping between them.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reservation engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationConfig {
    /// Budget for incrementing a course ledger.
    #[serde(default = "default_reserve")]
    pub reserve: RetryConfig,
    /// Budget for decrementing a course ledger.
    #[serde(default = "default_release")]
    pub release: RetryConfig,
    /// Budget for the booking record transition that follows a ledger write.
    #[serde(default = "default_record")]
    pub record: RetryConfig,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            reserve: default_reserve(),
            release: default_release(),
            record: default_record(),
        }
    }
}

/// A bounded exponential backoff budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts, including the first one. Zero is treated as one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the second attempt in milliseconds.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    /// Upper bound of a single delay in milliseconds.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
    /// Upper bound of all delays of one operation in milliseconds.
    #[serde(default = "default_max_total_wait")]
    pub max_total_wait_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            max_total_wait_ms: default_max_total_wait(),
        }
    }
}

impl RetryConfig {
    /// Delay before the second attempt.
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Upper bound of a single delay.
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// Upper bound of all delays combined.
    pub fn max_total_wait(&self) -> Duration {
        Duration::from_millis(self.max_total_wait_ms)
    }
}

fn default_reserve() -> RetryConfig {
    RetryConfig::default()
}

fn default_release() -> RetryConfig {
    // Releases are rarer than reserves and must not leave holds behind.
    RetryConfig {
        max_attempts: 8,
        ..RetryConfig::default()
    }
}

fn default_record() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        ..RetryConfig::default()
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff() -> u64 {
    5
}

fn default_max_backoff() -> u64 {
    200
}

fn default_max_total_wait() -> u64 {
    1000
}
