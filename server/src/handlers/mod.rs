//! HTTP handlers and router assembly.

pub mod demo;
pub mod health;

use crate::state::AppState;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Builds one worker's router with shared layers and state.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/demo", post(demo::demo_write))
        .route("/health", get(health::health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn(crate::middleware::request_id)),
        )
        .with_state(state)
}
