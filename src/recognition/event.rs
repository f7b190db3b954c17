use serde_json::Value;
use tracing::warn;

/// Codes the engine sends as bare acknowledgements with no body.
const STATUS_CODES: [&str; 5] = ["s", "S", "C", "e", "E"];

/// The engine has committed to this hypothesis.
const FINAL_CODE: &str = "A";
/// Still-changing partial hypothesis.
const INTERMEDIATE_CODE: &str = "U";

/// One classified event from the recognition engine.
#[derive(Debug, Clone)]
pub struct RecognitionEvent {
    /// Event-kind code from the wire frame; empty if the frame carried none.
    pub code: String,
    /// Recognized text; empty for acknowledgements and status signals.
    pub text: String,
    /// The decoded body, kept for observability.
    pub payload: Value,
}

impl RecognitionEvent {
    pub fn is_final(&self) -> bool {
        self.code == FINAL_CODE
    }

    pub fn is_intermediate(&self) -> bool {
        self.code == INTERMEDIATE_CODE
    }
}

/// Classify one inbound wire frame.
///
/// Returns `None` for bare status acknowledgements and for frames whose body
/// cannot be decoded; the receive loop keeps running either way. Frame forms,
/// tried in order:
/// 1. bare status code (`s`, `e`, ...) with no body
/// 2. `"<code> <jsonBody>"`
/// 3. a bare JSON document (code taken from its `code` field, if any)
pub fn classify_frame(frame: &str) -> Option<RecognitionEvent> {
    let trimmed = frame.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.len() <= 3 && STATUS_CODES.contains(&trimmed) {
        return None;
    }

    if let Some((code, body)) = split_code_body(trimmed) {
        return match serde_json::from_str::<Value>(body) {
            Ok(payload) => Some(build_event(code.to_string(), payload)),
            Err(e) => {
                warn!("discarding frame with malformed body (code {code}): {e}");
                None
            }
        };
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(payload) => Some(build_event(String::new(), payload)),
        Err(e) => {
            warn!("discarding undecodable frame: {e}");
            None
        }
    }
}

/// `"A {...}"` → `("A", "{...}")`. The code is always a single ASCII
/// character followed by a space.
fn split_code_body(frame: &str) -> Option<(&str, &str)> {
    let bytes = frame.as_bytes();
    if bytes.len() > 2 && bytes[0].is_ascii() && bytes[0] != b' ' && bytes[1] == b' ' {
        Some((&frame[..1], &frame[2..]))
    } else {
        None
    }
}

fn build_event(code: String, payload: Value) -> RecognitionEvent {
    let code = if code.is_empty() {
        payload
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    } else {
        code
    };

    let text = payload
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    RecognitionEvent {
        code,
        text,
        payload,
    }
}
