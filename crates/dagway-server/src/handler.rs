use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::trace;

use dagway_gateway::Gateway;

/// Shared state of the router.
#[derive(Clone, Debug)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

/// Health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = state.gateway.config();
    Json(json!({
        "name": "dagway",
        "version": env!("CARGO_PKG_VERSION"),
        "prefix": config.mount_point(),
        "cache_generation": state.gateway.cache().generation(),
        "node": state.gateway.node_status(),
    }))
}

/// Every request without a route of its own goes through the gateway.
pub async fn gateway_handler(State(state): State<AppState>, request: Request) -> Response {
    match state.gateway.handle(request).await {
        Some(response) => response,
        None => {
            trace!("not under the gateway prefix");
            (StatusCode::NOT_FOUND, "not found").into_response()
        }
    }
}
