//! Router configuration for the classification API.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/classify/text", post(handlers::classify_text))
        .route("/classify/file", post(handlers::classify_file))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
