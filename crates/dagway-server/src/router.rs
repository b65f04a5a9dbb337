use axum::http::Method;
use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router: health and info routes, everything else to the gateway.
pub fn build_router(state: AppState, allow_any_origin: bool) -> Router {
    let router = Router::new()
        .route("/health", get(handler::health_handler))
        .route("/info", get(handler::info_handler))
        .fallback(handler::gateway_handler)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if allow_any_origin {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::HEAD]),
        )
    } else {
        router
    }
}
