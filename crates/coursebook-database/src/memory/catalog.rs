//! In-memory course catalog.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::info;

use coursebook_core::result::AppResult;
use coursebook_core::types::{CourseId, Page, PageRequest};
use coursebook_entity::course::{Course, NewCourse};

use super::ledger::MemoryCapacityLedger;
use crate::store::CourseCatalog;

/// Course catalog held in process memory. Publishing opens the course's
/// entry in the shared ledger.
#[derive(Debug)]
pub struct MemoryCourseCatalog {
    courses: DashMap<CourseId, Course>,
    ledger: Arc<MemoryCapacityLedger>,
}

impl MemoryCourseCatalog {
    /// Create an empty catalog writing ledger entries into `ledger`.
    pub fn new(ledger: Arc<MemoryCapacityLedger>) -> Self {
        Self {
            courses: DashMap::new(),
            ledger,
        }
    }
}

#[async_trait]
impl CourseCatalog for MemoryCourseCatalog {
    async fn get_course(&self, id: CourseId) -> AppResult<Option<Course>> {
        Ok(self.courses.get(&id).map(|c| c.value().clone()))
    }

    async fn list_courses(&self, page: &PageRequest) -> AppResult<Page<Course>> {
        let mut rows: Vec<Course> = self
            .courses
            .iter()
            .filter(|c| page.admits(c.created_at, c.id.into_uuid()))
            .map(|c| c.value().clone())
            .collect();
        rows.sort_by_key(|c| (c.created_at, c.id));
        rows.truncate(page.fetch_limit() as usize);
        Ok(Page::from_rows(rows, page, |c| (c.created_at, c.id.into_uuid())))
    }

    async fn publish_course(&self, new_course: NewCourse) -> AppResult<Course> {
        new_course.validate()?;
        let course = new_course.into_course();
        self.ledger.open(course.id, course.capacity);
        self.courses.insert(course.id, course.clone());
        info!(course_id = %course.id, capacity = course.capacity, "Course published");
        Ok(course)
    }

    async fn clear(&self) -> AppResult<u64> {
        let count = self.courses.len() as u64;
        self.courses.clear();
        self.ledger.clear();
        Ok(count)
    }
}
