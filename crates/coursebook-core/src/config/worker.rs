//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Hold reconciliation worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the reconciliation sweep runs.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interval in seconds between sweeps.
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_seconds: u64,
    /// How long ledger drift must persist before orphaned holds are reclaimed.
    #[serde(default = "default_orphan_grace")]
    pub orphan_grace_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            reconcile_interval_seconds: default_reconcile_interval(),
            orphan_grace_seconds: default_orphan_grace(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_reconcile_interval() -> u64 {
    60
}

fn default_orphan_grace() -> u64 {
    300
}
