use crate::config::Config;
use crate::session::SessionRegistry;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Active call sessions, shared by the webhook and both WebSocket
    /// handlers.
    pub registry: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            registry: Arc::new(SessionRegistry::new()),
        }
    }
}
