use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Call-setup webhook
        .route("/voice", post(handlers::voice_webhook))
        // Per-call WebSockets
        .route("/stream", get(handlers::stream_ws))
        .route("/relay", get(handlers::relay_ws))
        // Request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
