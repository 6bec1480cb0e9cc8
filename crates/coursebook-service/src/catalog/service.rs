//! Course catalog service.

use std::sync::Arc;

use serde::Serialize;
use tracing::{Instrument, info, info_span};

use coursebook_core::error::AppError;
use coursebook_core::result::AppResult;
use coursebook_core::types::{CourseId, Page, PageRequest};
use coursebook_database::store::{CapacityLedger, CourseCatalog, Stores};
use coursebook_entity::course::{Course, NewCourse};

use crate::context::RequestContext;

/// A course together with its live seat counts.
#[derive(Debug, Clone, Serialize)]
pub struct CourseAvailability {
    /// The course descriptor.
    pub course: Course,
    /// Total seats.
    pub capacity: i32,
    /// Seats held by reserved bookings.
    pub reserved: i32,
    /// Seats still free.
    pub available: i32,
}

/// Read access to published courses, plus publishing.
#[derive(Debug, Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CourseCatalog>,
    ledger: Arc<dyn CapacityLedger>,
}

impl CatalogService {
    /// Creates a new catalog service.
    pub fn new(stores: &Stores) -> Self {
        Self {
            catalog: Arc::clone(&stores.catalog),
            ledger: Arc::clone(&stores.ledger),
        }
    }

    /// Read a course with its current availability. The ledger is always
    /// read fresh.
    pub async fn get_course(&self, ctx: &RequestContext, course_id: &str) -> AppResult<CourseAvailability> {
        let span = info_span!("get_course", request_id = %ctx.request_id, course_id = course_id);
        async move {
            let id = CourseId::parse(course_id)?;
            let course = self
                .catalog
                .get_course(id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("course {id} not found")))?;
            let entry = self.ledger.get(id).await?.ok_or_else(|| {
                AppError::storage_inconsistency(format!("course {id} has no capacity entry"))
            })?;

            Ok(CourseAvailability {
                capacity: entry.capacity,
                reserved: entry.reserved,
                available: entry.available(),
                course,
            })
        }
        .instrument(span)
        .await
    }

    /// List courses in publish order.
    pub async fn list_courses(
        &self,
        ctx: &RequestContext,
        page_token: Option<&str>,
        page_size: Option<u32>,
    ) -> AppResult<Page<Course>> {
        let span = info_span!("list_courses", request_id = %ctx.request_id);
        async move {
            let page = PageRequest::from_token(page_token, page_size)?;
            self.catalog.list_courses(&page).await
        }
        .instrument(span)
        .await
    }

    /// Publish a course and open its ledger entry.
    pub async fn publish_course(&self, ctx: &RequestContext, new_course: NewCourse) -> AppResult<Course> {
        let span = info_span!("publish_course", request_id = %ctx.request_id, name = %new_course.name);
        async move {
            let course = self.catalog.publish_course(new_course).await?;
            info!(course_id = %course.id, capacity = course.capacity, "Course available for booking");
            Ok(course)
        }
        .instrument(span)
        .await
    }
}
