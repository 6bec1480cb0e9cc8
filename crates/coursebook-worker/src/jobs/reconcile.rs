//! Hold reconciliation: compare each course's ledger count with its
//! reserved bookings and repair drift that outlives the grace period.
//!
//! Drift is expected while an operation is between its two writes, so a
//! course is only repaired once drift of the same sign has been observed
//! continuously for the grace period. The repair never exceeds the
//! smallest drift seen in that window.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use coursebook_core::config::worker::WorkerConfig;
use coursebook_core::result::AppResult;
use coursebook_core::types::CourseId;
use coursebook_database::store::{BookingStore, CapacityLedger, StoreError, Stores};
use coursebook_entity::course::CapacityEntry;
use coursebook_service::retry::{RetryError, RetryPolicy, retry_conditional};

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Courses inspected.
    pub courses_checked: usize,
    /// Courses whose ledger disagreed with their bookings.
    pub drifting: usize,
    /// Orphaned seats returned to the ledger.
    pub reclaimed: i64,
    /// Lost seats re-added to the ledger.
    pub restored: i64,
    /// Courses whose repair failed.
    pub failures: usize,
}

/// Drift of one sign, tracked since it was first seen.
#[derive(Debug, Clone, Copy)]
struct Observation {
    first_seen: DateTime<Utc>,
    /// Smallest absolute drift seen, signed like the drift.
    smallest: i64,
}

/// Repairs ledger drift left behind by interrupted operations.
#[derive(Debug)]
pub struct HoldReconciler {
    ledger: Arc<dyn CapacityLedger>,
    bookings: Arc<dyn BookingStore>,
    grace: Duration,
    policy: RetryPolicy,
    observations: DashMap<CourseId, Observation>,
}

impl HoldReconciler {
    /// Create a reconciler over the given stores.
    pub fn new(stores: &Stores, config: &WorkerConfig, policy: RetryPolicy) -> Self {
        Self {
            ledger: Arc::clone(&stores.ledger),
            bookings: Arc::clone(&stores.bookings),
            grace: i64::try_from(config.orphan_grace_seconds)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
            policy,
            observations: DashMap::new(),
        }
    }

    /// Number of courses with drift still inside its grace period.
    pub fn pending(&self) -> usize {
        self.observations.len()
    }

    /// Run one sweep now.
    pub async fn sweep(&self) -> AppResult<SweepReport> {
        self.sweep_at(Utc::now()).await
    }

    /// Run one sweep as of `now`.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let entries = self.ledger.entries().await?;
        let live: HashSet<CourseId> = entries.iter().map(|e| e.course_id).collect();
        let mut report = SweepReport {
            courses_checked: entries.len(),
            ..SweepReport::default()
        };

        for entry in entries {
            let held = match self.bookings.count_reserved(entry.course_id).await {
                Ok(held) => held,
                Err(e) => {
                    warn!(course_id = %entry.course_id, error = %e, "Failed to count reserved bookings");
                    report.failures += 1;
                    continue;
                }
            };

            let drift = i64::from(entry.reserved) - held;
            if drift == 0 {
                self.observations.remove(&entry.course_id);
                continue;
            }
            report.drifting += 1;

            let Some(amount) = self.due_repair(entry.course_id, drift, now) else {
                debug!(course_id = %entry.course_id, drift, "Drift inside grace period");
                continue;
            };

            match self.repair(&entry, amount).await {
                Ok(applied) => {
                    self.observations.remove(&entry.course_id);
                    if applied < 0 {
                        report.reclaimed += -applied;
                    } else {
                        report.restored += applied;
                    }
                }
                Err(e) => {
                    error!(course_id = %entry.course_id, drift, error = %e, "Failed to repair ledger drift");
                    report.failures += 1;
                }
            }
        }

        // Forget courses that no longer exist.
        self.observations.retain(|id, _| live.contains(id));

        if report.drifting > 0 || report.failures > 0 {
            info!(
                courses_checked = report.courses_checked,
                drifting = report.drifting,
                reclaimed = report.reclaimed,
                restored = report.restored,
                failures = report.failures,
                "Hold reconciliation sweep finished"
            );
        }
        Ok(report)
    }

    /// Record `drift` and return the signed repair once the grace period
    /// has passed.
    fn due_repair(&self, course_id: CourseId, drift: i64, now: DateTime<Utc>) -> Option<i64> {
        let mut observation = self.observations.entry(course_id).or_insert(Observation {
            first_seen: now,
            smallest: drift,
        });

        if observation.smallest.signum() != drift.signum() {
            *observation = Observation {
                first_seen: now,
                smallest: drift,
            };
        } else if drift.abs() < observation.smallest.abs() {
            observation.smallest = drift;
        }

        (now - observation.first_seen >= self.grace).then_some(-observation.smallest)
    }

    /// Apply `delta` seats to the ledger, clamped to what the bounds allow.
    /// Returns the delta actually applied.
    async fn repair(&self, entry: &CapacityEntry, delta: i64) -> Result<i64, StoreError> {
        let ledger = &self.ledger;
        let course_id = entry.course_id;

        let applied = retry_conditional(&self.policy, move |_| async move {
            let current = ledger.get(course_id).await?.ok_or(StoreError::Vanished)?;
            let step = clamp_to_bounds(&current, delta);
            if step == 0 {
                return Ok(0);
            }
            ledger
                .conditional_adjust(course_id, step, current.version)
                .await
                .map(|_| i64::from(step))
        })
        .await
        .map_err(|e| match e {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Aborted(e) => e,
        })?;

        if applied != delta {
            warn!(%course_id, wanted = delta, applied, "Ledger repair clamped to capacity bounds");
        } else {
            info!(%course_id, applied, "Ledger drift repaired");
        }
        Ok(applied)
    }
}

/// Largest part of `delta` that keeps `reserved` within `[0, capacity]`.
fn clamp_to_bounds(entry: &CapacityEntry, delta: i64) -> i32 {
    let reserved = i64::from(entry.reserved);
    let target = (reserved + delta).clamp(0, i64::from(entry.capacity));
    // Difference of two values within i32 range.
    i32::try_from(target - reserved).unwrap_or(0)
}
