//! Booking repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::warn;

use coursebook_cache::CacheManager;
use coursebook_cache::keys;
use coursebook_core::result::AppResult;
use coursebook_core::traits::CacheProvider;
use coursebook_core::types::{BookingId, CourseId, Page, PageRequest};
use coursebook_entity::booking::{Booking, BookingStatus};

use super::db_err;
use crate::store::{BookingFilter, BookingMutation, BookingStore, StoreError};

/// Repository for booking records. Bookings in a terminal state never
/// change again and are served from the cache.
#[derive(Debug, Clone)]
pub struct BookingRepository {
    pool: PgPool,
    cache: CacheManager,
}

impl BookingRepository {
    /// Create a new booking repository.
    pub fn new(pool: PgPool, cache: CacheManager) -> Self {
        Self { pool, cache }
    }

    async fn cached(&self, id: BookingId) -> Option<Booking> {
        match self.cache.get_json(&keys::booking_by_id(id.into_uuid())).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(booking_id = %id, error = %e, "Booking cache read failed");
                None
            }
        }
    }

    async fn remember_if_terminal(&self, booking: &Booking) {
        if !booking.is_terminal() {
            return;
        }
        if let Err(e) = self
            .cache
            .set_json(&keys::booking_by_id(booking.id.into_uuid()), booking)
            .await
        {
            warn!(booking_id = %booking.id, error = %e, "Booking cache write failed");
        }
    }

    async fn fetch(&self, id: BookingId) -> AppResult<Option<Booking>> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find booking"))
    }
}

#[async_trait]
impl BookingStore for BookingRepository {
    async fn insert(&self, booking: Booking) -> AppResult<Booking> {
        sqlx::query_as::<_, Booking>(
            "INSERT INTO bookings (id, course_id, status, price, version, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(booking.id)
        .bind(booking.course_id)
        .bind(booking.status)
        .bind(booking.price)
        .bind(booking.version)
        .bind(booking.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to create booking"))
    }

    async fn get(&self, id: BookingId) -> AppResult<Option<Booking>> {
        if let Some(booking) = self.cached(id).await {
            return Ok(Some(booking));
        }
        let booking = self.fetch(id).await?;
        if let Some(booking) = &booking {
            self.remember_if_terminal(booking).await;
        }
        Ok(booking)
    }

    async fn conditional_update(
        &self,
        id: BookingId,
        expected_version: i64,
        mutate: BookingMutation<'_>,
    ) -> Result<Booking, StoreError> {
        let current = self.get(id).await?.ok_or(StoreError::Vanished)?;
        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual: current.version,
            });
        }

        let mut next = current;
        mutate(&mut next).map_err(StoreError::Rejected)?;

        let updated = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET status = $3, version = version + 1, \
             reserved_at = $4, expired_at = $5, completed_at = $6 \
             WHERE id = $1 AND version = $2 RETURNING *",
        )
        .bind(id)
        .bind(expected_version)
        .bind(next.status)
        .bind(next.reserved_at)
        .bind(next.expired_at)
        .bind(next.completed_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to update booking"))?;

        match updated {
            Some(booking) => {
                self.remember_if_terminal(&booking).await;
                Ok(booking)
            }
            None => match self.fetch(id).await? {
                Some(stored) => Err(StoreError::VersionConflict {
                    expected: expected_version,
                    actual: stored.version,
                }),
                None => Err(StoreError::Vanished),
            },
        }
    }

    async fn list(&self, filter: &BookingFilter, page: &PageRequest) -> AppResult<Page<Booking>> {
        let mut query =
            sqlx::QueryBuilder::<sqlx::Postgres>::new("SELECT * FROM bookings WHERE created_at <= ");
        query.push_bind(page.as_of);
        if let Some(course_id) = filter.course_id {
            query.push(" AND course_id = ").push_bind(course_id);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(after) = &page.after {
            query
                .push(" AND (created_at, id) > (")
                .push_bind(after.created_at)
                .push(", ")
                .push_bind(after.id)
                .push(")");
        }
        query
            .push(" ORDER BY created_at, id LIMIT ")
            .push_bind(page.fetch_limit());

        let rows = query
            .build_query_as::<Booking>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list bookings"))?;
        Ok(Page::from_rows(rows, page, |b| (b.created_at, b.id.into_uuid())))
    }

    async fn count_reserved(&self, course_id: CourseId) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bookings WHERE course_id = $1 AND status = $2")
            .bind(course_id)
            .bind(BookingStatus::Reserved)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("Failed to count reserved bookings"))
    }

    async fn clear(&self) -> AppResult<u64> {
        self.cache.delete_pattern(&keys::booking_pattern()).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(db_err("Database health check failed"))
    }
}
