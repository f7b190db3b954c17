//! Telephony provider protocol types
//!
//! This module owns the provider-facing wire shapes:
//! - The envelope framing of the audio-ingest WebSocket (`start` / `media` /
//!   `stop` events carrying base64 8kHz mu-law payloads)
//! - The outbound reply message for the response-relay WebSocket
//! - The XML wiring document returned from the call-setup webhook

mod messages;
mod twiml;

pub use messages::{MediaPayload, RelayTextMessage, StreamEnvelope, StreamStart};
pub use twiml::{wiring_document, WiringParams};
