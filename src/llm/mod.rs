//! Reply generation
//!
//! The bridge treats the language model as a single async call: finalized
//! utterance text in, reply text out. One generator instance per call holds
//! that call's running conversation context.

mod client;

pub use client::{GeminiClient, APOLOGY};

use async_trait::async_trait;

/// One running conversation with the language model.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Generate a reply to `user_text`, extending the conversation context.
    ///
    /// Infallible by contract: a call must always receive some spoken
    /// response, so remote failures are substituted with a fixed apology
    /// string instead of being surfaced.
    async fn generate(&self, user_text: &str) -> String;
}
