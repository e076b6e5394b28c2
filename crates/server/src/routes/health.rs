//! Liveness and readiness probes.

use axum::{extract::State, http::StatusCode};
use tracing::warn;

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable unless both the store and the cache
/// backend answer.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    let store = state.meal_plans().store();
    if let Err(e) = store.health_check().await {
        warn!(backend = store.backend_name(), error = %e, "store not ready");
        return StatusCode::SERVICE_UNAVAILABLE;
    }

    let cache = state.cache_backend();
    if let Err(e) = cache.health_check().await {
        warn!(backend = cache.backend_name(), error = %e, "cache not ready");
        return StatusCode::SERVICE_UNAVAILABLE;
    }

    StatusCode::OK
}
