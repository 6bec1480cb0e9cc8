//! Course repository: catalog descriptors and the capacity ledger share the
//! `courses` table.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info, warn};

use coursebook_cache::CacheManager;
use coursebook_cache::keys;
use coursebook_core::result::AppResult;
use coursebook_core::traits::CacheProvider;
use coursebook_core::types::{CourseId, Page, PageRequest};
use coursebook_entity::course::{CapacityEntry, Course, NewCourse};

use super::db_err;
use crate::store::{CapacityLedger, CourseCatalog, StoreError};

const COURSE_COLUMNS: &str = "id, name, description, capacity, price, created_at";
const ENTRY_COLUMNS: &str = "id AS course_id, capacity, reserved, version";

/// Repository for courses and their ledger entries.
#[derive(Debug, Clone)]
pub struct CourseRepository {
    pool: PgPool,
    cache: CacheManager,
}

impl CourseRepository {
    /// Create a new course repository.
    pub fn new(pool: PgPool, cache: CacheManager) -> Self {
        Self { pool, cache }
    }

    async fn cached_course(&self, id: CourseId) -> Option<Course> {
        match self.cache.get_json(&keys::course_by_id(id.into_uuid())).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(course_id = %id, error = %e, "Course cache read failed");
                None
            }
        }
    }

    async fn remember_course(&self, course: &Course) {
        if let Err(e) = self
            .cache
            .set_json(&keys::course_by_id(course.id.into_uuid()), course)
            .await
        {
            warn!(course_id = %course.id, error = %e, "Course cache write failed");
        }
    }
}

#[async_trait]
impl CourseCatalog for CourseRepository {
    async fn get_course(&self, id: CourseId) -> AppResult<Option<Course>> {
        if let Some(course) = self.cached_course(id).await {
            return Ok(Some(course));
        }
        let course = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to find course"))?;

        if let Some(course) = &course {
            self.remember_course(course).await;
        }
        Ok(course)
    }

    async fn list_courses(&self, page: &PageRequest) -> AppResult<Page<Course>> {
        let mut query = sqlx::QueryBuilder::<sqlx::Postgres>::new(format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE created_at <= "
        ));
        query.push_bind(page.as_of);
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
            .build_query_as::<Course>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list courses"))?;
        Ok(Page::from_rows(rows, page, |c| (c.created_at, c.id.into_uuid())))
    }

    async fn publish_course(&self, new_course: NewCourse) -> AppResult<Course> {
        new_course.validate()?;
        let course = new_course.into_course();
        let course = sqlx::query_as::<_, Course>(&format!(
            "INSERT INTO courses (id, name, description, capacity, price, reserved, version, created_at) \
             VALUES ($1, $2, $3, $4, $5, 0, 1, $6) RETURNING {COURSE_COLUMNS}"
        ))
        .bind(course.id)
        .bind(&course.name)
        .bind(&course.description)
        .bind(course.capacity)
        .bind(course.price)
        .bind(course.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to publish course"))?;

        info!(course_id = %course.id, capacity = course.capacity, "Course published");
        self.remember_course(&course).await;
        Ok(course)
    }

    async fn clear(&self) -> AppResult<u64> {
        self.cache.delete_pattern(&keys::course_pattern()).await
    }
}

#[async_trait]
impl CapacityLedger for CourseRepository {
    async fn get(&self, course_id: CourseId) -> AppResult<Option<CapacityEntry>> {
        sqlx::query_as::<_, CapacityEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to read capacity entry"))
    }

    async fn conditional_adjust(
        &self,
        course_id: CourseId,
        delta: i32,
        expected_version: i64,
    ) -> Result<CapacityEntry, StoreError> {
        let updated = sqlx::query_as::<_, CapacityEntry>(&format!(
            "UPDATE courses SET reserved = reserved + $2, version = version + 1 \
             WHERE id = $1 AND version = $3 AND reserved + $2 BETWEEN 0 AND capacity \
             RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(course_id)
        .bind(delta)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to adjust capacity entry"))?;

        if let Some(entry) = updated {
            debug!(%course_id, delta, reserved = entry.reserved, version = entry.version, "Ledger adjusted");
            return Ok(entry);
        }

        // Nothing matched: find out which precondition failed.
        let current = CapacityLedger::get(self, course_id)
            .await?
            .ok_or(StoreError::Vanished)?;
        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual: current.version,
            });
        }
        Err(StoreError::CapacityViolation {
            capacity: current.capacity,
            reserved: current.reserved,
            delta,
        })
    }

    async fn entries(&self) -> AppResult<Vec<CapacityEntry>> {
        sqlx::query_as::<_, CapacityEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM courses ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list capacity entries"))
    }
}
