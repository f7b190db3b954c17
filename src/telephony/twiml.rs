use std::fmt::Write;

/// Inputs for the call wiring document.
pub struct WiringParams<'a> {
    /// Public host the provider should connect back to.
    pub host: &'a str,
    pub session_id: &'a str,
    pub language_code: &'a str,
    pub tts_provider: &'a str,
    pub voice: &'a str,
    pub transcription_provider: &'a str,
    pub speech_model: &'a str,
}

/// Build the TwiML document returned from the call-setup webhook.
///
/// It wires the new call to both WebSocket endpoints: a media stream toward
/// `/stream` carrying the session id as a custom parameter, and a
/// conversation relay toward `/relay` carrying it as a query parameter. The
/// session id is the only correlation between the two connections.
pub fn wiring_document(params: &WiringParams<'_>) -> String {
    let host = escape_xml(params.host);
    let session_id = escape_xml(params.session_id);
    let language = escape_xml(params.language_code);
    let tts_provider = escape_xml(params.tts_provider);
    let voice = escape_xml(params.voice);

    let mut doc = String::new();
    doc.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    doc.push_str("<Response>");

    let _ = write!(
        doc,
        "<Start><Stream url=\"wss://{host}/stream\">\
         <Parameter name=\"session_id\" value=\"{session_id}\"/>\
         </Stream></Start>"
    );

    let _ = write!(
        doc,
        "<Connect><ConversationRelay url=\"wss://{host}/relay?session_id={session_id}\" \
         language=\"{language}\" ttsProvider=\"{tts_provider}\" voice=\"{voice}\">\
         <Language code=\"{language}\" ttsProvider=\"{tts_provider}\" voice=\"{voice}\" \
         transcriptionProvider=\"{}\" speechModel=\"{}\"/>\
         </ConversationRelay></Connect>",
        escape_xml(params.transcription_provider),
        escape_xml(params.speech_model),
    );

    doc.push_str("</Response>");
    doc
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
