//! Booking entity model.

use chrono::{DateTime, Utc};
use coursebook_core::AppError;
use coursebook_core::types::{BookingId, CourseId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::{BookingStatus, Transition};

/// A request to hold one seat in a course.
///
/// `version` is the optimistic-concurrency token: stores bump it on every
/// durable write and reject writes that carry a stale value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Booking {
    /// Unique booking identifier.
    pub id: BookingId,
    /// The course this booking targets (not owned).
    pub course_id: CourseId,
    /// Current lifecycle status.
    pub status: BookingStatus,
    /// Price agreed when the booking was created.
    pub price: f64,
    /// Optimistic-concurrency token.
    pub version: i64,
    /// When the booking was created.
    pub created_at: DateTime<Utc>,
    /// When the booking took its seat.
    pub reserved_at: Option<DateTime<Utc>>,
    /// When the booking expired.
    pub expired_at: Option<DateTime<Utc>>,
    /// When the booking was completed.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Build a fresh `Created` booking at version 1.
    pub fn create(new: NewBooking) -> Self {
        Self {
            id: BookingId::new(),
            course_id: new.course_id,
            status: BookingStatus::Created,
            price: new.price,
            version: 1,
            created_at: Utc::now(),
            reserved_at: None,
            expired_at: None,
            completed_at: None,
        }
    }

    /// Move the booking through `transition`, stamping the matching
    /// timestamp. Timestamps are never reset.
    pub fn transition(&mut self, transition: Transition, at: DateTime<Utc>) -> Result<(), AppError> {
        let next = self.status.apply(transition)?;
        match next {
            BookingStatus::Reserved => {
                self.reserved_at.get_or_insert(at);
            }
            BookingStatus::Expired => {
                self.expired_at.get_or_insert(at);
            }
            BookingStatus::Completed => {
                self.completed_at.get_or_insert(at);
            }
            BookingStatus::Created => {}
        }
        self.status = next;
        Ok(())
    }

    /// Check if the booking currently holds a seat.
    pub fn holds_seat(&self) -> bool {
        self.status.holds_seat()
    }

    /// Check if the booking can no longer change.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Input for creating a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBooking {
    /// Target course.
    pub course_id: CourseId,
    /// Agreed price.
    pub price: f64,
}

impl NewBooking {
    /// Validate the caller-supplied price.
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(AppError::invalid_argument(format!(
                "price must be a non-negative number, got {}",
                self.price
            )));
        }
        Ok(())
    }
}
