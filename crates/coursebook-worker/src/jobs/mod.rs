//! Built-in background jobs.

pub mod reconcile;

pub use reconcile::{HoldReconciler, SweepReport};
