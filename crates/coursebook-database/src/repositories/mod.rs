//! PostgreSQL repositories implementing the storage contracts.

pub mod booking;
pub mod course;

use std::sync::Arc;

use coursebook_cache::CacheManager;
use coursebook_core::error::{AppError, ErrorKind};
use sqlx::PgPool;

pub use booking::BookingRepository;
pub use course::CourseRepository;

use crate::store::Stores;

/// Build a complete PostgreSQL backend. Only immutable rows go through `cache`.
pub fn postgres_stores(pool: PgPool, cache: CacheManager) -> Stores {
    let courses = Arc::new(CourseRepository::new(pool.clone(), cache.clone()));
    Stores {
        ledger: courses.clone(),
        bookings: Arc::new(BookingRepository::new(pool, cache)),
        catalog: courses,
    }
}

/// Map a sqlx error. Pool exhaustion and I/O failures are reported as
/// unavailability so callers may retry later.
pub(crate) fn db_err(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        let kind = match &e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                ErrorKind::ServiceUnavailable
            }
            _ => ErrorKind::Database,
        };
        AppError::with_source(kind, context, e)
    }
}
