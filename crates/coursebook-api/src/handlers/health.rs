//! Health check handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use coursebook_core::traits::cache::CacheProvider;

use crate::dto::response::{HealthResponse, ReadinessResponse};
use crate::state::AppState;

/// GET /healthz
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /readyz
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let store = probe("store", state.stores.bookings.health_check().await);
    let cache = probe("cache", state.cache.health_check().await);
    let ready = store && cache;

    let label = |ok: bool| if ok { "ok" } else { "unavailable" }.to_string();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            status: if ready { "ready" } else { "unavailable" }.to_string(),
            store: label(store),
            cache: label(cache),
        }),
    )
}

fn probe(name: &str, result: coursebook_core::AppResult<bool>) -> bool {
    match result {
        Ok(healthy) => healthy,
        Err(e) => {
            tracing::warn!(backend = name, error = %e, "Readiness probe failed");
            false
        }
    }
}
