//! Streaming recognition engine client
//!
//! One persistent WebSocket per call speaking the engine's line-oriented
//! protocol: a text start command (`s MULAW -a-general ...`), binary audio
//! frames prefixed with `p`, inbound `"<code> <json>"` result lines, and a
//! bare `e` to end the session. Inbound frames are classified into typed
//! [`RecognitionEvent`]s and handed to the session in arrival order.

mod channel;
mod event;

pub use channel::{start_command, RecognitionChannel};
pub use event::{classify_frame, RecognitionEvent};
