//! Cache key builders for every Coursebook cache entry.

use uuid::Uuid;

const PREFIX: &str = "cb";

/// Cache key for a published course descriptor.
pub fn course_by_id(course_id: Uuid) -> String {
    format!("{PREFIX}:course:{course_id}")
}

/// Pattern matching every cached course.
pub fn course_pattern() -> String {
    format!("{PREFIX}:course:*")
}

/// Cache key for a booking in a terminal state.
pub fn booking_by_id(booking_id: Uuid) -> String {
    format!("{PREFIX}:booking:{booking_id}")
}

/// Pattern matching every cached booking.
pub fn booking_pattern() -> String {
    format!("{PREFIX}:booking:*")
}
