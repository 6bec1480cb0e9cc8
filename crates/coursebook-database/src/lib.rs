//! # coursebook-database
//!
//! Storage for Coursebook: the contracts the reservation engine consumes
//! (capacity ledger, booking store, course catalog), their PostgreSQL
//! repositories, and in-memory implementations for single-node runs and
//! tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::{BookingFilter, BookingStore, CapacityLedger, CourseCatalog, StoreError, Stores};
