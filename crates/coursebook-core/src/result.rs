//! Convenience result type alias for Coursebook.

use crate::error::AppError;

/// A specialized `Result` type for Coursebook operations.
pub type AppResult<T> = Result<T, AppError>;
