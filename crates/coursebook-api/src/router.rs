//! Route table.

use axum::Router;
use axum::routing::{get, post};

use crate::handlers::{booking, course, health};
use crate::state::AppState;

/// Prefix shared by every versioned route.
pub const API_PREFIX: &str = "/api/course/v1";

/// Builds the router with every route, without middleware.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/bookings",
            post(booking::create_booking).get(booking::list_bookings),
        )
        .route("/bookings/{id}", get(booking::get_booking))
        .route("/bookings/{id}/reserve", post(booking::reserve_booking))
        .route("/bookings/{id}/expire", post(booking::expire_booking))
        .route(
            "/courses",
            get(course::list_courses).post(course::publish_course),
        )
        .route("/courses/{id}", get(course::get_course));

    Router::new()
        .route("/healthz", get(health::liveness))
        .route("/readyz", get(health::readiness))
        .nest(API_PREFIX, api)
        .with_state(state)
}
