//! Request DTOs.

use serde::{Deserialize, Serialize};

use coursebook_entity::course::NewCourse;
use coursebook_service::ListBookingsQuery;

/// Create booking request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    /// Course id.
    pub course: String,
    /// Agreed price.
    pub price: f64,
}

/// Query parameters for `GET /bookings`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListBookingsParams {
    /// Filter by course id.
    pub course: Option<String>,
    /// Filter by status.
    pub status: Option<String>,
    /// Continuation token.
    pub page_token: Option<String>,
    /// Items per page (default: 25, max: 100).
    pub page_size: Option<u32>,
}

impl From<ListBookingsParams> for ListBookingsQuery {
    fn from(params: ListBookingsParams) -> Self {
        Self {
            course: params.course,
            status: params.status,
            page_token: params.page_token,
            page_size: params.page_size,
        }
    }
}

/// Query parameters for `GET /courses`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListCoursesParams {
    /// Continuation token.
    pub page_token: Option<String>,
    /// Items per page (default: 25, max: 100).
    pub page_size: Option<u32>,
}

/// Publish course request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishCourseRequest {
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Total seats.
    pub capacity: i32,
    /// List price.
    pub price: f64,
}

impl From<PublishCourseRequest> for NewCourse {
    fn from(req: PublishCourseRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            capacity: req.capacity,
            price: req.price,
        }
    }
}
