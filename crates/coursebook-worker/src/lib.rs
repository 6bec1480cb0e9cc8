//! Background work for Coursebook.
//!
//! Reserving and expiring write the capacity ledger and the booking record
//! separately. A crash or cancellation between the two writes leaves the
//! ledger out of step with the records. This crate provides:
//! - [`HoldReconciler`], a sweep that detects and repairs that drift
//! - [`ReconcileScheduler`], which runs the sweep on a fixed interval

pub mod jobs;
pub mod scheduler;

pub use jobs::{HoldReconciler, SweepReport};
pub use scheduler::ReconcileScheduler;
