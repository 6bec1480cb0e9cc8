//! In-memory stores backed by [`dashmap::DashMap`].
//!
//! Each conditional write holds the shard lock of its single key for the
//! duration of the compare-and-swap, which is exactly the atomicity the
//! storage contracts promise.

pub mod booking;
pub mod catalog;
pub mod ledger;

use std::sync::Arc;

pub use booking::MemoryBookingStore;
pub use catalog::MemoryCourseCatalog;
pub use ledger::MemoryCapacityLedger;

use crate::store::Stores;

/// Build a complete in-memory backend.
pub fn memory_stores() -> Stores {
    let ledger = Arc::new(MemoryCapacityLedger::new());
    let catalog = Arc::new(MemoryCourseCatalog::new(Arc::clone(&ledger)));
    Stores {
        ledger,
        bookings: Arc::new(MemoryBookingStore::new()),
        catalog,
    }
}
