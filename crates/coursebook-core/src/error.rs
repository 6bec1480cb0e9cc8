//! Unified application error types for Coursebook.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the `?` operator. [`ErrorKind`] is a pure
//! classification: translating a kind into a wire status belongs to the
//! transport layer, never to this crate.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested booking or course does not exist.
    NotFound,
    /// An identifier, price, or page token is malformed.
    InvalidArgument,
    /// The booking's current state forbids the requested operation.
    InvalidStateTransition,
    /// The booking is already expired (terminal).
    AlreadyExpired,
    /// The booking is already completed (terminal).
    AlreadyCompleted,
    /// The course has no free seat left.
    CapacityExhausted,
    /// Reserving a seat lost every optimistic-concurrency attempt.
    ReservationRetryExhausted,
    /// Releasing a seat lost every optimistic-concurrency attempt.
    ReleaseRetryExhausted,
    /// A conditional write found its record gone mid-operation.
    StorageInconsistency,
    /// A database error occurred.
    Database,
    /// A cache error occurred.
    Cache,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
    /// A backend is temporarily unavailable.
    ServiceUnavailable,
}

impl ErrorKind {
    /// Whether repeating the whole operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ReservationRetryExhausted | Self::ReleaseRetryExhausted | Self::ServiceUnavailable
        )
    }

    /// Whether the error reports a booking already in a terminal state.
    pub fn is_terminal_state(&self) -> bool {
        matches!(self, Self::AlreadyExpired | Self::AlreadyCompleted)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
            Self::InvalidStateTransition => write!(f, "INVALID_STATE_TRANSITION"),
            Self::AlreadyExpired => write!(f, "ALREADY_EXPIRED"),
            Self::AlreadyCompleted => write!(f, "ALREADY_COMPLETED"),
            Self::CapacityExhausted => write!(f, "CAPACITY_EXHAUSTED"),
            Self::ReservationRetryExhausted => write!(f, "RESERVATION_RETRY_EXHAUSTED"),
            Self::ReleaseRetryExhausted => write!(f, "RELEASE_RETRY_EXHAUSTED"),
            Self::StorageInconsistency => write!(f, "STORAGE_INCONSISTENCY"),
            Self::Database => write!(f, "DATABASE"),
            Self::Cache => write!(f, "CACHE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
            Self::ServiceUnavailable => write!(f, "SERVICE_UNAVAILABLE"),
        }
    }
}

/// The unified application error used throughout Coursebook.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Create an invalid-state-transition error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidStateTransition, message)
    }

    /// The booking is already expired.
    pub fn already_expired() -> Self {
        Self::new(ErrorKind::AlreadyExpired, "booking already expired")
    }

    /// The booking is already completed.
    pub fn already_completed() -> Self {
        Self::new(ErrorKind::AlreadyCompleted, "booking already completed")
    }

    /// The course is full.
    pub fn capacity_exhausted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CapacityExhausted, message)
    }

    /// Reservation retries were used up by contention.
    pub fn reservation_retry_exhausted() -> Self {
        Self::new(
            ErrorKind::ReservationRetryExhausted,
            "reservation max retry exceeded",
        )
    }

    /// Release retries were used up by contention.
    pub fn release_retry_exhausted() -> Self {
        Self::new(
            ErrorKind::ReleaseRetryExhausted,
            "booking release max retry exceeded",
        )
    }

    /// A conditional write affected no record.
    pub fn storage_inconsistency(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StorageInconsistency, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cache, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create a service-unavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Internal, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
