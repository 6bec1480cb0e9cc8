//! In-memory booking store.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use coursebook_core::error::AppError;
use coursebook_core::result::AppResult;
use coursebook_core::types::{BookingId, CourseId, Page, PageRequest};
use coursebook_entity::booking::{Booking, BookingStatus};

use crate::store::{BookingFilter, BookingMutation, BookingStore, StoreError};

/// Booking store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryBookingStore {
    bookings: DashMap<BookingId, Booking>,
}

impl MemoryBookingStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn insert(&self, booking: Booking) -> AppResult<Booking> {
        match self.bookings.entry(booking.id) {
            Entry::Occupied(_) => Err(AppError::internal(format!(
                "booking {} already exists",
                booking.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(booking.clone());
                Ok(booking)
            }
        }
    }

    async fn get(&self, id: BookingId) -> AppResult<Option<Booking>> {
        Ok(self.bookings.get(&id).map(|b| b.value().clone()))
    }

    async fn conditional_update(
        &self,
        id: BookingId,
        expected_version: i64,
        mutate: BookingMutation<'_>,
    ) -> Result<Booking, StoreError> {
        let mut stored = self.bookings.get_mut(&id).ok_or(StoreError::Vanished)?;
        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual: stored.version,
            });
        }

        let mut next = stored.clone();
        mutate(&mut next).map_err(StoreError::Rejected)?;
        next.version = expected_version + 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn list(&self, filter: &BookingFilter, page: &PageRequest) -> AppResult<Page<Booking>> {
        let mut rows: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| filter.matches(b) && page.admits(b.created_at, b.id.into_uuid()))
            .map(|b| b.value().clone())
            .collect();
        rows.sort_by_key(|b| (b.created_at, b.id));
        rows.truncate(page.fetch_limit() as usize);
        Ok(Page::from_rows(rows, page, |b| {
            (b.created_at, b.id.into_uuid())
        }))
    }

    async fn count_reserved(&self, course_id: CourseId) -> AppResult<i64> {
        Ok(self
            .bookings
            .iter()
            .filter(|b| b.course_id == course_id && b.status == BookingStatus::Reserved)
            .count() as i64)
    }

    async fn clear(&self) -> AppResult<u64> {
        let count = self.bookings.len() as u64;
        self.bookings.clear();
        Ok(count)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
