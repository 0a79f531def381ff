//! HTTP router configuration

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::api::{devices, docs, system};
use crate::state::AppState;

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Devices
        .route("/devices/", get(devices::list_devices))
        .route(
            "/devices/{name}/",
            get(devices::get_device)
                .put(devices::update_device)
                .patch(devices::patch_device)
                .delete(devices::delete_device),
        )
        .route("/devices/{name}/packages/", get(devices::device_packages))
        .route("/devices/{name}/updates/", get(devices::device_updates))
        // System endpoints
        .route("/health", get(system::health))
        .route("/api-docs/openapi.json", get(docs::openapi_json))
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}
