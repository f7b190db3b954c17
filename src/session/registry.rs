use super::Session;
use crate::error::BridgeError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Process-wide map of live call sessions.
///
/// Injected into the connection handlers through shared state; there is no
/// ambient global. Safe under interleaved create/get/remove from independent
/// connection-accept paths. A session is present here exactly while it is
/// not closed: the webhook inserts it and [`Session::close`] removes it.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a freshly created session. On a duplicate id the existing
    /// entry is left untouched and call setup fails.
    pub async fn create(&self, session: Arc<Session>) -> Result<(), BridgeError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(session.id()) {
            return Err(BridgeError::DuplicateSession(session.id().to_string()));
        }
        sessions.insert(session.id().to_string(), session);
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Idempotent: removing an absent id is a no-op.
    pub async fn remove(&self, id: &str) {
        if self.sessions.write().await.remove(id).is_some() {
            info!("session {id} removed from registry");
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
