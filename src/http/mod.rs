//! HTTP surface of the bridge
//!
//! - POST /voice — call-setup webhook; registers a session and returns the
//!   XML document wiring the provider to the two WebSocket endpoints
//! - GET /stream — audio-ingest WebSocket (caller audio in)
//! - GET /relay — response-relay WebSocket (reply text out toward TTS)
//! - GET /health — liveness check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
