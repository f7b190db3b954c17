pub mod config;
pub mod error;
pub mod http;
pub mod llm;
pub mod recognition;
pub mod session;
pub mod telephony;

pub use config::Config;
pub use error::BridgeError;
pub use http::{create_router, AppState};
pub use llm::{GeminiClient, ResponseGenerator, APOLOGY};
pub use recognition::{classify_frame, start_command, RecognitionChannel, RecognitionEvent};
pub use session::{Session, SessionRegistry, SessionState};
pub use telephony::{
    wiring_document, MediaPayload, RelayTextMessage, StreamEnvelope, StreamStart, WiringParams,
};
