//! Storage contracts consumed by the reservation engine.
//!
//! Every conditional write is a single-entity compare-and-swap on a version
//! token. No contract offers cross-entity transactions.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use coursebook_core::error::{AppError, ErrorKind};
use coursebook_core::result::AppResult;
use coursebook_core::types::{BookingId, CourseId, Page, PageRequest};
use coursebook_entity::booking::{Booking, BookingStatus};
use coursebook_entity::course::{CapacityEntry, Course, NewCourse};

/// Why a conditional write did not apply.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record changed since it was read. Safe to re-read and retry.
    #[error("version conflict: expected {expected}, found {actual}")]
    VersionConflict {
        /// Version the caller based its write on.
        expected: i64,
        /// Version currently stored.
        actual: i64,
    },
    /// Applying the delta would move `reserved` outside `[0, capacity]`.
    #[error("capacity violation: {reserved} {delta:+} outside [0, {capacity}]")]
    CapacityViolation {
        /// Total seats.
        capacity: i32,
        /// Seats held when the write was attempted.
        reserved: i32,
        /// Requested change.
        delta: i32,
    },
    /// The record disappeared between the read and the write.
    #[error("record vanished during conditional write")]
    Vanished,
    /// The mutation refused the current record.
    #[error(transparent)]
    Rejected(AppError),
    /// The backend failed.
    #[error(transparent)]
    Backend(AppError),
}

impl StoreError {
    /// Whether the failure is contention that a fresh read may resolve.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

impl From<AppError> for StoreError {
    fn from(err: AppError) -> Self {
        Self::Backend(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Rejected(e) | StoreError::Backend(e) => e,
            StoreError::Vanished => {
                AppError::storage_inconsistency("record vanished during conditional write")
            }
            other @ StoreError::VersionConflict { .. } => {
                AppError::new(ErrorKind::Internal, other.to_string())
            }
            other @ StoreError::CapacityViolation { .. } => {
                AppError::capacity_exhausted(other.to_string())
            }
        }
    }
}

/// Mutation applied by [`BookingStore::conditional_update`].
pub type BookingMutation<'a> = &'a (dyn Fn(&mut Booking) -> AppResult<()> + Send + Sync);

/// Filter for [`BookingStore::list`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookingFilter {
    /// Only bookings for this course.
    pub course_id: Option<CourseId>,
    /// Only bookings in this status.
    pub status: Option<BookingStatus>,
}

impl BookingFilter {
    /// Whether a booking passes the filter.
    pub fn matches(&self, booking: &Booking) -> bool {
        self.course_id.is_none_or(|c| c == booking.course_id)
            && self.status.is_none_or(|s| s == booking.status)
    }
}

/// Per-course seat counter with optimistic concurrency.
#[async_trait]
pub trait CapacityLedger: Send + Sync + std::fmt::Debug + 'static {
    /// Read the current entry for a course.
    async fn get(&self, course_id: CourseId) -> AppResult<Option<CapacityEntry>>;

    /// Apply `reserved += delta` when the stored version equals
    /// `expected_version` and the result stays within `[0, capacity]`.
    /// Returns the updated entry, whose version is one higher.
    async fn conditional_adjust(
        &self,
        course_id: CourseId,
        delta: i32,
        expected_version: i64,
    ) -> Result<CapacityEntry, StoreError>;

    /// Every ledger entry, for reconciliation sweeps.
    async fn entries(&self) -> AppResult<Vec<CapacityEntry>>;
}

/// Booking records with optimistic concurrency.
#[async_trait]
pub trait BookingStore: Send + Sync + std::fmt::Debug + 'static {
    /// Persist a new booking.
    async fn insert(&self, booking: Booking) -> AppResult<Booking>;

    /// Read one booking.
    async fn get(&self, id: BookingId) -> AppResult<Option<Booking>>;

    /// Apply `mutate` to the booking when its stored version equals
    /// `expected_version`. The store bumps the version; a mutation error is
    /// returned as [`StoreError::Rejected`] and nothing is written.
    async fn conditional_update(
        &self,
        id: BookingId,
        expected_version: i64,
        mutate: BookingMutation<'_>,
    ) -> Result<Booking, StoreError>;

    /// List bookings ordered by `(created_at, id)` ascending.
    async fn list(&self, filter: &BookingFilter, page: &PageRequest) -> AppResult<Page<Booking>>;

    /// Number of `Reserved` bookings for a course.
    async fn count_reserved(&self, course_id: CourseId) -> AppResult<i64>;

    /// Drop the store's process-local state. Returns the number of entries dropped.
    async fn clear(&self) -> AppResult<u64>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}

/// Published course descriptors.
#[async_trait]
pub trait CourseCatalog: Send + Sync + std::fmt::Debug + 'static {
    /// Read one course.
    async fn get_course(&self, id: CourseId) -> AppResult<Option<Course>>;

    /// List courses ordered by `(created_at, id)` ascending.
    async fn list_courses(&self, page: &PageRequest) -> AppResult<Page<Course>>;

    /// Publish a course together with an empty ledger entry.
    async fn publish_course(&self, new_course: NewCourse) -> AppResult<Course>;

    /// Drop the catalog's process-local state. Returns the number of entries dropped.
    async fn clear(&self) -> AppResult<u64>;
}

/// The three stores a running service needs, behind trait objects.
#[derive(Debug, Clone)]
pub struct Stores {
    /// Capacity ledger.
    pub ledger: Arc<dyn CapacityLedger>,
    /// Booking records.
    pub bookings: Arc<dyn BookingStore>,
    /// Course catalog.
    pub catalog: Arc<dyn CourseCatalog>,
}

impl Stores {
    /// Clear the catalog and booking stores. Failures are logged, never fatal.
    pub async fn clear(&self) {
        match self.catalog.clear().await {
            Ok(count) => tracing::info!(count, "Cleared course catalog"),
            Err(e) => tracing::warn!(error = %e, "Failed to clear course catalog"),
        }
        match self.bookings.clear().await {
            Ok(count) => tracing::info!(count, "Cleared booking store"),
            Err(e) => tracing::warn!(error = %e, "Failed to clear booking store"),
        }
    }
}
