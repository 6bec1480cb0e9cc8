//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use coursebook_core::types::Page;
use coursebook_entity::booking::{Booking, BookingStatus};
use coursebook_entity::course::Course;
use coursebook_service::CourseAvailability;

/// A booking as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingResponse {
    /// Booking id.
    pub id: Uuid,
    /// Course id.
    pub course: Uuid,
    /// Lifecycle status.
    pub status: BookingStatus,
    /// Agreed price.
    pub price: f64,
    /// Optimistic-concurrency version.
    pub version: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// When a seat was taken.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_at: Option<DateTime<Utc>>,
    /// When the booking expired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired_at: Option<DateTime<Utc>>,
    /// When the booking completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id.into_uuid(),
            course: b.course_id.into_uuid(),
            status: b.status,
            price: b.price,
            version: b.version,
            created_at: b.created_at,
            reserved_at: b.reserved_at,
            expired_at: b.expired_at,
            completed_at: b.completed_at,
        }
    }
}

/// One page of bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListBookingsResponse {
    /// Bookings on this page.
    pub bookings: Vec<BookingResponse>,
    /// Token for the next page; empty when the listing is done.
    pub next_page_token: String,
}

impl From<Page<Booking>> for ListBookingsResponse {
    fn from(page: Page<Booking>) -> Self {
        let page = page.map(BookingResponse::from);
        Self {
            bookings: page.items,
            next_page_token: page.next_page_token.unwrap_or_default(),
        }
    }
}

/// A course descriptor, with live seat counts when they were read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseResponse {
    /// Course id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Total seats.
    pub capacity: i32,
    /// List price.
    pub price: f64,
    /// Seats held.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved: Option<i32>,
    /// Seats free.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<i32>,
    /// Publish time.
    pub created_at: DateTime<Utc>,
}

impl From<Course> for CourseResponse {
    fn from(c: Course) -> Self {
        Self {
            id: c.id.into_uuid(),
            name: c.name,
            description: c.description,
            capacity: c.capacity,
            price: c.price,
            reserved: None,
            available: None,
            created_at: c.created_at,
        }
    }
}

impl From<CourseAvailability> for CourseResponse {
    fn from(a: CourseAvailability) -> Self {
        Self {
            capacity: a.capacity,
            reserved: Some(a.reserved),
            available: Some(a.available),
            ..Self::from(a.course)
        }
    }
}

/// One page of courses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListCoursesResponse {
    /// Courses on this page.
    pub courses: Vec<CourseResponse>,
    /// Token for the next page; empty when the listing is done.
    pub next_page_token: String,
}

impl From<Page<Course>> for ListCoursesResponse {
    fn from(page: Page<Course>) -> Self {
        let page = page.map(CourseResponse::from);
        Self {
            courses: page.items,
            next_page_token: page.next_page_token.unwrap_or_default(),
        }
    }
}

/// Liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: String,
    /// Server version.
    pub version: String,
}

/// Readiness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// `ready` or `unavailable`.
    pub status: String,
    /// Store backend status.
    pub store: String,
    /// Cache backend status.
    pub cache: String,
}
