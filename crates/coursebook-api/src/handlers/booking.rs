//! Booking lifecycle handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use crate::dto::request::{CreateBookingRequest, ListBookingsParams};
use crate::dto::response::{BookingResponse, ListBookingsResponse};
use crate::error::ApiError;
use crate::extractors::RequestCtx;
use crate::state::AppState;

/// POST /api/course/v1/bookings
pub async fn create_booking(
    State(state): State<AppState>,
    RequestCtx(ctx): RequestCtx,
    body: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let Json(req) = body?;
    let booking = state
        .booking_service
        .create_booking(&ctx, &req.course, req.price)
        .await?;
    Ok((StatusCode::CREATED, Json(booking.into())))
}

/// GET /api/course/v1/bookings
pub async fn list_bookings(
    State(state): State<AppState>,
    RequestCtx(ctx): RequestCtx,
    params: Result<Query<ListBookingsParams>, QueryRejection>,
) -> Result<Json<ListBookingsResponse>, ApiError> {
    let Query(params) = params?;
    let page = state
        .booking_service
        .list_bookings(&ctx, &params.into())
        .await?;
    Ok(Json(page.into()))
}

/// GET /api/course/v1/bookings/{id}
pub async fn get_booking(
    State(state): State<AppState>,
    RequestCtx(ctx): RequestCtx,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking = state.booking_service.get_booking(&ctx, &id).await?;
    Ok(Json(booking.into()))
}

/// POST /api/course/v1/bookings/{id}/reserve
pub async fn reserve_booking(
    State(state): State<AppState>,
    RequestCtx(ctx): RequestCtx,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking = state.booking_service.reserve_booking(&ctx, &id).await?;
    Ok(Json(booking.into()))
}

/// POST /api/course/v1/bookings/{id}/expire
pub async fn expire_booking(
    State(state): State<AppState>,
    RequestCtx(ctx): RequestCtx,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking = state.booking_service.expire_booking(&ctx, &id).await?;
    Ok(Json(booking.into()))
}
