//! Booking status and the lifecycle state machine.
//!
//! ```text
//! Created ──reserve──▶ Reserved ──complete──▶ Completed
//!    │                    │
//!    └──────expire────────┴──────▶ Expired
//! ```
//!
//! `Completed` and `Expired` are terminal.

use std::fmt;
use std::str::FromStr;

use coursebook_core::AppError;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Created, no seat held.
    Created,
    /// Holding one seat in the course ledger.
    Reserved,
    /// Fulfilled by the completion path.
    Completed,
    /// Released or abandoned.
    Expired,
}

/// An operation that moves a booking between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Take a seat.
    Reserve,
    /// Give up the booking, releasing its seat if one is held.
    Expire,
    /// Fulfil a reserved booking.
    Complete,
}

impl BookingStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [BookingStatus; 4] = [
        Self::Created,
        Self::Reserved,
        Self::Completed,
        Self::Expired,
    ];

    /// Check if the booking can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Expired)
    }

    /// Whether this status accounts for one seat in the ledger.
    pub fn holds_seat(&self) -> bool {
        matches!(self, Self::Reserved)
    }

    /// Resolve the status a transition leads to.
    ///
    /// Terminal states report their own error kinds so idempotent callers
    /// can tell "already done" apart from a genuinely invalid request.
    pub fn apply(self, transition: Transition) -> Result<BookingStatus, AppError> {
        match (self, transition) {
            (Self::Created, Transition::Reserve) => Ok(Self::Reserved),
            (Self::Created | Self::Reserved, Transition::Expire) => Ok(Self::Expired),
            (Self::Reserved, Transition::Complete) => Ok(Self::Completed),
            (Self::Expired, _) => Err(AppError::already_expired()),
            (Self::Completed, _) => Err(AppError::already_completed()),
            (Self::Reserved, Transition::Reserve) => {
                Err(AppError::invalid_state("booking already reserved"))
            }
            (Self::Created, Transition::Complete) => {
                Err(AppError::invalid_state("booking is not reserved"))
            }
        }
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Reserved => "reserved",
            Self::Completed => "completed",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" => Ok(Self::Created),
            "reserved" => Ok(Self::Reserved),
            "completed" => Ok(Self::Completed),
            "expired" => Ok(Self::Expired),
            other => Err(AppError::invalid_argument(format!(
                "unknown booking status '{other}'"
            ))),
        }
    }
}
