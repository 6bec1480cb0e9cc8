//! Per-course capacity ledger row.

use coursebook_core::types::CourseId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Seats taken versus seats available for one course.
///
/// Invariant: `0 <= reserved <= capacity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CapacityEntry {
    /// The course this entry counts seats for.
    pub course_id: CourseId,
    /// Total seats, fixed when the course is published.
    pub capacity: i32,
    /// Seats currently held by `Reserved` bookings.
    pub reserved: i32,
    /// Optimistic-concurrency token.
    pub version: i64,
}

impl CapacityEntry {
    /// A fresh entry for a newly published course.
    pub fn opened(course_id: CourseId, capacity: i32) -> Self {
        Self {
            course_id,
            capacity,
            reserved: 0,
            version: 1,
        }
    }

    /// Seats still free.
    pub fn available(&self) -> i32 {
        (self.capacity - self.reserved).max(0)
    }

    /// The reserved count after applying `delta`, if it stays in bounds.
    pub fn adjusted(&self, delta: i32) -> Option<i32> {
        self.reserved
            .checked_add(delta)
            .filter(|next| (0..=self.capacity).contains(next))
    }
}
