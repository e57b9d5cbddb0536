use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    cache: &'static str,
    cache_entries: usize,
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Reports the active cache mode. A Redis backend that stopped answering
/// makes the instance not ready.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.cache.stats();
    let redis_down = stats.mode == "redis" && !state.cache.is_redis_available().await;
    let (status, label) = if redis_down {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    } else {
        (StatusCode::OK, "ready")
    };
    (
        status,
        Json(ReadyResponse {
            status: label,
            cache: stats.mode,
            cache_entries: stats.local_entries,
        }),
    )
}
