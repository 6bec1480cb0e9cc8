//! Course descriptor model.

use chrono::{DateTime, Utc};
use coursebook_core::AppError;
use coursebook_core::types::CourseId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A published course. Immutable once published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Course {
    /// Unique course identifier.
    pub id: CourseId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Total seats.
    pub capacity: i32,
    /// List price.
    pub price: f64,
    /// When the course was published.
    pub created_at: DateTime<Utc>,
}

/// Input for publishing a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourse {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Total seats.
    pub capacity: i32,
    /// List price.
    pub price: f64,
}

impl NewCourse {
    /// Validate the descriptor before it is published.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::invalid_argument("course name must not be empty"));
        }
        if self.capacity < 0 {
            return Err(AppError::invalid_argument(format!(
                "capacity must be non-negative, got {}",
                self.capacity
            )));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(AppError::invalid_argument("price must be a non-negative number"));
        }
        Ok(())
    }

    /// Materialize the descriptor with a fresh id.
    pub fn into_course(self) -> Course {
        Course {
            id: CourseId::new(),
            name: self.name,
            description: self.description,
            capacity: self.capacity,
            price: self.price,
            created_at: Utc::now(),
        }
    }
}
