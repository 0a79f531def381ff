//! Liveness endpoint

use axum::Json;
use otagate_api::responses::HealthResponse;

/// Daemon liveness; does not touch the backends
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Daemon is up", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
