use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use voice_bridge::{Config, ResponseGenerator, Session, SessionRegistry};

/// Built-in defaults; no config file or environment required.
pub fn test_config() -> Arc<Config> {
    Arc::new(Config::load("config/voice-bridge").expect("default config loads"))
}

/// Generator that counts calls and echoes deterministically.
pub struct CountingGenerator {
    pub calls: AtomicUsize,
}

impl CountingGenerator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResponseGenerator for CountingGenerator {
    async fn generate(&self, user_text: &str) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        format!("reply to {user_text}")
    }
}

pub fn make_session(
    registry: &Arc<SessionRegistry>,
    id: &str,
    generator: Arc<dyn ResponseGenerator>,
) -> Arc<Session> {
    Session::new(
        id.to_string(),
        test_config(),
        Arc::downgrade(registry),
        generator,
    )
}
