//! Periodic scheduling of the hold reconciliation sweep.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler};

use coursebook_core::error::AppError;

use crate::jobs::HoldReconciler;

/// Runs [`HoldReconciler::sweep`] on a fixed interval.
pub struct ReconcileScheduler {
    scheduler: JobScheduler,
    reconciler: Arc<HoldReconciler>,
    interval: Duration,
}

impl std::fmt::Debug for ReconcileScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileScheduler")
            .field("interval", &self.interval)
            .finish()
    }
}

impl ReconcileScheduler {
    /// Create a scheduler that sweeps every `interval`.
    pub async fn new(reconciler: Arc<HoldReconciler>, interval: Duration) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            reconciler,
            interval: interval.max(Duration::from_secs(1)),
        })
    }

    /// The reconciler driven by this scheduler.
    pub fn reconciler(&self) -> &Arc<HoldReconciler> {
        &self.reconciler
    }

    /// Register the sweep and start ticking.
    pub async fn start(&self) -> Result<(), AppError> {
        let reconciler = Arc::clone(&self.reconciler);
        // A slow sweep must not overlap with the next tick.
        let running = Arc::new(AtomicBool::new(false));

        let job = Job::new_repeated_async(self.interval, move |_uuid, _lock| {
            let reconciler = Arc::clone(&reconciler);
            let running = Arc::clone(&running);
            Box::pin(async move {
                let Some(_guard) = SweepGuard::acquire(&running) else {
                    tracing::debug!("Previous reconciliation sweep still running, skipping tick");
                    return;
                };
                if let Err(e) = reconciler.sweep().await {
                    tracing::error!(error = %e, "Hold reconciliation sweep failed");
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create reconcile schedule: {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add reconcile schedule: {e}")))?;

        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!(interval_secs = self.interval.as_secs(), "Hold reconciliation scheduled");
        Ok(())
    }

    /// Stop the scheduler. A sweep in progress finishes on its own.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Reconcile scheduler shut down");
        Ok(())
    }
}

/// Marks a sweep as running; the mark is cleared on drop, including unwinds.
struct SweepGuard<'a>(&'a AtomicBool);

impl<'a> SweepGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        (!flag.swap(true, Ordering::AcqRel)).then_some(Self(flag))
    }
}

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
