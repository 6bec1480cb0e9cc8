//! Shared value types.

pub mod id;
pub mod pagination;

pub use id::{BookingId, CourseId};
pub use pagination::{Cursor, Page, PageRequest};
