//! Course catalog handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use crate::dto::request::{ListCoursesParams, PublishCourseRequest};
use crate::dto::response::{CourseResponse, ListCoursesResponse};
use crate::error::ApiError;
use crate::extractors::RequestCtx;
use crate::state::AppState;

/// GET /api/course/v1/courses
pub async fn list_courses(
    State(state): State<AppState>,
    RequestCtx(ctx): RequestCtx,
    params: Result<Query<ListCoursesParams>, QueryRejection>,
) -> Result<Json<ListCoursesResponse>, ApiError> {
    let Query(params) = params?;
    let page = state
        .catalog_service
        .list_courses(&ctx, params.page_token.as_deref(), params.page_size)
        .await?;
    Ok(Json(page.into()))
}

/// GET /api/course/v1/courses/{id}
pub async fn get_course(
    State(state): State<AppState>,
    RequestCtx(ctx): RequestCtx,
    Path(id): Path<String>,
) -> Result<Json<CourseResponse>, ApiError> {
    let course = state.catalog_service.get_course(&ctx, &id).await?;
    Ok(Json(course.into()))
}

/// POST /api/course/v1/courses
pub async fn publish_course(
    State(state): State<AppState>,
    RequestCtx(ctx): RequestCtx,
    body: Result<Json<PublishCourseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    let Json(req) = body?;
    let course = state
        .catalog_service
        .publish_course(&ctx, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(course.into())))
}
