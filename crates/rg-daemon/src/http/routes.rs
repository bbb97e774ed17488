//! HTTP API Route Definitions

use axum::{Router, routing::get};

use super::handlers::{self, AppState};

/// Create the API router with all routes
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/lastrain", get(handlers::last_rain))
        .route("/archive/:period", get(handlers::archive))
        .route("/status", get(handlers::status))
        .route("/health", get(handlers::health))
        .with_state(app_state)
}
