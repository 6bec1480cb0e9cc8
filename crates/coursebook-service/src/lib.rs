//! # coursebook-service
//!
//! Business logic for Coursebook. The booking service is the reservation
//! engine: it enforces the booking state machine and drives the retry
//! combinator against the capacity ledger and the booking store.
//!
//! Services follow constructor injection: every dependency is provided at
//! construction time via `Arc` references.

pub mod booking;
pub mod catalog;
pub mod context;
pub mod retry;

pub use booking::{BookingService, ListBookingsQuery};
pub use catalog::{CatalogService, CourseAvailability};
pub use context::RequestContext;
pub use retry::{Contended, RetryError, RetryPolicy, retry_conditional};
