use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Inbound envelope on the audio-ingest WebSocket (Media Streams framing).
///
/// The `event` discriminant is kept as a plain string so event kinds this
/// service does not know about still parse and can be ignored.
#[derive(Debug, Deserialize)]
pub struct StreamEnvelope {
    pub event: String,
    #[serde(default)]
    pub start: Option<StreamStart>,
    #[serde(default)]
    pub media: Option<MediaPayload>,
}

/// Metadata on the `start` event. The session id arrives as a custom
/// parameter embedded by the call-setup webhook.
#[derive(Debug, Deserialize)]
pub struct StreamStart {
    #[serde(rename = "customParameters", default)]
    pub custom_parameters: HashMap<String, String>,
    #[serde(rename = "streamSid", default)]
    pub stream_sid: Option<String>,
}

impl StreamStart {
    pub fn session_id(&self) -> Option<&str> {
        self.custom_parameters.get("session_id").map(String::as_str)
    }
}

/// `media` event payload: base64-encoded 8kHz mu-law audio.
#[derive(Debug, Deserialize)]
pub struct MediaPayload {
    pub payload: String,
}

/// Outbound reply message on the response-relay WebSocket. The provider
/// synthesizes `token` as speech on the caller's leg.
#[derive(Debug, Serialize)]
pub struct RelayTextMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub token: String,
    pub last: bool,
    pub lang: String,
}

impl RelayTextMessage {
    /// A complete (non-streamed) reply in one message.
    pub fn text(token: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            kind: "text",
            token: token.into(),
            last: true,
            lang: lang.into(),
        }
    }
}
