use super::state::AppState;
use crate::error::BridgeError;
use crate::llm::GeminiClient;
use crate::session::Session;
use crate::telephony::{wiring_document, StreamEnvelope, WiringParams};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use base64::Engine;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// POST /voice
/// Call-setup webhook: create and register a session, answer with the
/// wiring document pointing the provider at /stream and /relay, both
/// carrying the fresh session id as the correlation parameter.
pub async fn voice_webhook(State(state): State<AppState>, headers: HeaderMap) -> Response {
    // Behind a tunnel/proxy the public hostname arrives forwarded.
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|v| v.to_str().ok());
    let Some(host) = host else {
        warn!("voice webhook without a usable host header");
        return StatusCode::BAD_REQUEST.into_response();
    };

    let session_id = uuid::Uuid::new_v4().to_string();
    let generator = Arc::new(GeminiClient::new(
        &state.config.llm.base_url,
        &state.config.llm.model,
        &state.config.llm.api_key,
        &state.config.llm.system_instruction,
    ));
    let session = Session::new(
        session_id.clone(),
        Arc::clone(&state.config),
        Arc::downgrade(&state.registry),
        generator,
    );

    if let Err(e) = state.registry.create(session).await {
        error!("call setup aborted: {e}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    info!("call setup: session {session_id} wired via {host}");

    let relay = &state.config.relay;
    let twiml = wiring_document(&WiringParams {
        host,
        session_id: &session_id,
        language_code: &relay.language_code,
        tts_provider: &relay.tts_provider,
        voice: &relay.voice,
        transcription_provider: &relay.transcription_provider,
        speech_model: &relay.speech_model,
    });

    ([(header::CONTENT_TYPE, "application/xml")], twiml).into_response()
}

/// GET /stream
/// Audio-ingest WebSocket carrying the provider's media-stream envelope.
pub async fn stream_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_stream(socket, state))
}

async fn handle_stream(mut socket: WebSocket, state: AppState) {
    debug!("audio-ingest connected, waiting for start event");

    // Unknown until the start event names a session.
    let mut session: Option<Arc<Session>> = None;

    while let Some(frame) = socket.recv().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("audio-ingest read error: {e}");
                break;
            }
        };

        let envelope: StreamEnvelope = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(e) => {
                let err = BridgeError::MalformedMessage {
                    peer: "audio-ingest",
                    detail: e.to_string(),
                };
                warn!("{err}, frame discarded");
                continue;
            }
        };

        match envelope.event.as_str() {
            "start" => {
                let id = envelope
                    .start
                    .as_ref()
                    .and_then(|s| s.session_id())
                    .map(str::to_string);
                let Some(id) = id else {
                    warn!("start event without session_id, dropping connection");
                    return;
                };

                let Some(found) = state.registry.get(&id).await else {
                    warn!(
                        "{}, dropping audio-ingest connection",
                        BridgeError::SessionNotFound(id)
                    );
                    return;
                };

                if !found.attach_audio_ingest() {
                    // The original attachment keeps the call.
                    return;
                }
                found.open_recognition().await;
                session = Some(found);
            }
            "media" => {
                let (Some(session), Some(media)) = (session.as_ref(), envelope.media) else {
                    continue;
                };
                match base64::engine::general_purpose::STANDARD.decode(media.payload) {
                    Ok(chunk) => session.submit_audio(&chunk).await,
                    Err(e) => warn!("undecodable media payload discarded: {e}"),
                }
            }
            "stop" => {
                info!("audio-ingest stop received");
                break;
            }
            other => debug!("ignoring audio-ingest event '{other}'"),
        }
    }

    if let Some(session) = session {
        info!("audio-ingest disconnected for session {}", session.id());
        session.close().await;
    }
}

#[derive(Debug, Deserialize)]
pub struct RelayQuery {
    pub session_id: Option<String>,
}

/// GET /relay
/// Response-relay WebSocket: replies flow out toward the provider's TTS
/// leg; inbound relay messages are observed in logs only.
pub async fn relay_ws(
    ws: WebSocketUpgrade,
    Query(query): Query<RelayQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_relay(socket, query, state))
}

async fn handle_relay(socket: WebSocket, query: RelayQuery, state: AppState) {
    let Some(session_id) = query.session_id else {
        warn!("relay connection without session_id, dropping");
        return;
    };

    let Some(session) = state.registry.get(&session_id).await else {
        warn!(
            "{}, dropping relay connection",
            BridgeError::SessionNotFound(session_id.clone())
        );
        return;
    };

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    if !session.attach_relay(tx) {
        // A relay is already attached; only its termination ends the call.
        return;
    }

    info!("relay connected for session {session_id}");
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                let Some(json) = outbound else { break };
                if let Err(e) = sink.send(Message::Text(json)).await {
                    warn!("session {session_id}: relay send failed, reply lost: {e}");
                    break;
                }
                info!("session {session_id}: reply relayed");
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        debug!("session {session_id}: relay message: {text}");
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("session {session_id}: relay read error: {e}");
                        break;
                    }
                }
            }
        }
    }

    info!("relay disconnected for session {session_id}");
    session.close().await;
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
