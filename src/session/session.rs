use super::SessionRegistry;
use crate::config::Config;
use crate::llm::ResponseGenerator;
use crate::recognition::{start_command, RecognitionChannel, RecognitionEvent};
use crate::telephony::RelayTextMessage;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

/// Lifecycle of one call. The recorded state only ever moves forward, even
/// though the underlying links may attach in any physical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum SessionState {
    Created = 0,
    AudioLinked = 1,
    RecognitionLinked = 2,
    RelayLinked = 3,
    Active = 4,
    Closing = 5,
    Closed = 6,
}

impl SessionState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Created,
            1 => Self::AudioLinked,
            2 => Self::RecognitionLinked,
            3 => Self::RelayLinked,
            4 => Self::Active,
            5 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Orchestrator state and resources for one phone call.
///
/// Owns the recognition channel and the reply generator, holds a
/// single-assignment sender toward the relay connection, and routes
/// recognition events between them. Callbacks may arrive from different
/// tasks (audio-ingest handler, relay handler, recognition drain task,
/// detached reply tasks), so every shared field is individually guarded;
/// no lock is ever held across an await of another.
pub struct Session {
    id: String,
    config: Arc<Config>,
    registry: Weak<SessionRegistry>,
    generator: Arc<dyn ResponseGenerator>,

    state: AtomicU8,
    audio_linked: AtomicBool,
    recognition_linked: AtomicBool,

    /// The one recognition channel for this call, opened lazily on the
    /// audio-ingest start event.
    recognition: Mutex<Option<Arc<RecognitionChannel>>>,

    /// Single-assignment sender to the relay WebSocket writer. Absent until
    /// the relay connection attaches; never reassigned.
    relay: OnceLock<mpsc::UnboundedSender<String>>,

    /// Diagnostic only.
    audio_frames: AtomicU64,

    closed: AtomicBool,
    started_at: chrono::DateTime<Utc>,
}

impl Session {
    pub fn new(
        id: String,
        config: Arc<Config>,
        registry: Weak<SessionRegistry>,
        generator: Arc<dyn ResponseGenerator>,
    ) -> Arc<Self> {
        info!("session {id} created");

        Arc::new(Self {
            id,
            config,
            registry,
            generator,
            state: AtomicU8::new(SessionState::Created as u8),
            audio_linked: AtomicBool::new(false),
            recognition_linked: AtomicBool::new(false),
            recognition: Mutex::new(None),
            relay: OnceLock::new(),
            audio_frames: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            started_at: Utc::now(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_raw(self.state.load(Ordering::SeqCst))
    }

    pub fn audio_frame_count(&self) -> u64 {
        self.audio_frames.load(Ordering::SeqCst)
    }

    /// Forward-only state transition.
    fn advance(&self, to: SessionState) {
        let _ = self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (to as u8 > current).then_some(to as u8)
            });
    }

    fn maybe_activate(&self) {
        let all_linked = self.audio_linked.load(Ordering::SeqCst)
            && self.recognition_linked.load(Ordering::SeqCst)
            && self.relay.get().is_some();
        if all_linked {
            self.advance(SessionState::Active);
            info!("session {} active, all three links up", self.id);
        }
    }

    /// Called once by the audio-ingest handler when the start event arrives.
    /// A second attachment is rejected; the call continues on the original.
    pub fn attach_audio_ingest(&self) -> bool {
        if self.audio_linked.swap(true, Ordering::SeqCst) {
            warn!("session {}: audio ingest already attached", self.id);
            return false;
        }
        self.advance(SessionState::AudioLinked);
        self.maybe_activate();
        info!("session {}: audio ingest attached", self.id);
        true
    }

    /// Called once by the relay handler. The sender is single-assignment; a
    /// second relay connection is rejected and the original keeps the call.
    pub fn attach_relay(&self, tx: mpsc::UnboundedSender<String>) -> bool {
        if self.relay.set(tx).is_err() {
            warn!("session {}: relay already attached, keeping original", self.id);
            return false;
        }
        self.advance(SessionState::RelayLinked);
        self.maybe_activate();
        info!("session {}: relay attached", self.id);
        true
    }

    /// Open the recognition channel and start draining its events.
    ///
    /// Fails open: if the engine is unreachable the call is left degraded
    /// (audio keeps flowing and is dropped, no recognition) rather than
    /// dropping an already-connected caller. No retry.
    pub async fn open_recognition(self: &Arc<Self>) {
        // The lock is held across the connect, so a concurrent close() waits
        // here and then tears down whatever this call stored.
        let mut guard = self.recognition.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            warn!(
                "session {}: already closed, not opening recognition",
                self.id
            );
            return;
        }
        if guard.is_some() {
            warn!("session {}: recognition channel already open", self.id);
            return;
        }

        let command = start_command(
            &self.config.recognition.engine,
            &self.config.recognition.appkey,
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        match RecognitionChannel::open(&self.config.recognition.url, &command, tx).await {
            Ok(channel) => {
                *guard = Some(Arc::new(channel));
                drop(guard);

                self.recognition_linked.store(true, Ordering::SeqCst);
                self.advance(SessionState::RecognitionLinked);
                self.maybe_activate();

                // One drain task per channel keeps delivery in arrival order.
                let session = Arc::clone(self);
                tokio::spawn(async move {
                    while let Some(event) = rx.recv().await {
                        session.on_recognition_event(event);
                    }
                    debug!("session {}: recognition event stream ended", session.id);
                });
            }
            Err(e) => {
                error!(
                    "session {}: recognition unavailable, call continues without it: {e}",
                    self.id
                );
            }
        }
    }

    /// Forward one chunk of caller audio to the recognition channel.
    ///
    /// Audio arriving before the channel finishes its handshake is dropped,
    /// not queued; speech content near call start is an accepted loss.
    /// Transmission failures are logged and dropped.
    pub async fn submit_audio(&self, chunk: &[u8]) {
        let channel = self.recognition.lock().await.clone();
        let Some(channel) = channel else {
            debug!(
                "session {}: dropping {} audio bytes, recognition not open",
                self.id,
                chunk.len()
            );
            return;
        };

        let count = self.audio_frames.fetch_add(1, Ordering::SeqCst) + 1;
        if count % 50 == 0 {
            debug!("session {}: {count} audio frames forwarded", self.id);
        }

        if let Err(e) = channel.send_audio(chunk).await {
            warn!("session {}: {e}", self.id);
        }
    }

    /// Route one recognition event.
    ///
    /// Only final hypotheses with non-empty text reach the generator.
    /// Partials are unstable and observed in logs only; events without text
    /// are acknowledgements; unknown codes are discarded for forward
    /// compatibility with protocol additions.
    pub fn on_recognition_event(self: &Arc<Self>, event: RecognitionEvent) {
        if event.text.is_empty() {
            debug!("session {}: status event '{}' discarded", self.id, event.code);
            return;
        }

        if event.is_intermediate() {
            debug!("session {}: partial hypothesis: {}", self.id, event.text);
            return;
        }

        if event.is_final() {
            info!("session {}: final hypothesis: {}", self.id, event.text);
            self.dispatch_reply(event.text);
            return;
        }

        debug!(
            "session {}: unhandled event code '{}' with text: {}",
            self.id, event.code, event.text
        );
    }

    /// Generate and deliver a reply without blocking event processing.
    ///
    /// One detached task per final event; the session keeps no handle to it.
    /// Replies for utterances finalized in quick succession race, and
    /// whichever finishes generating first is relayed first.
    pub fn dispatch_reply(self: &Arc<Self>, user_text: String) {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let reply = session.generator.generate(&user_text).await;
            info!("session {}: reply: {reply}", session.id);
            session.send_relay_text(&reply);
        });
    }

    /// Push one reply envelope toward the relay connection. A missing or
    /// already-closed relay means the reply is dropped and logged, never
    /// retried.
    pub fn send_relay_text(&self, text: &str) {
        let Some(tx) = self.relay.get() else {
            warn!("session {}: no relay connection, dropping reply", self.id);
            return;
        };

        let message = RelayTextMessage::text(text, self.config.relay.language_code.clone());
        match serde_json::to_string(&message) {
            Ok(json) => {
                if tx.send(json).is_err() {
                    warn!("session {}: relay connection gone, reply dropped", self.id);
                }
            }
            Err(e) => error!("session {}: reply serialization failed: {e}", self.id),
        }
    }

    /// Tear the session down: close the recognition channel and leave the
    /// registry. Idempotent; both connection handlers (and any stop signal)
    /// may race here and exactly one teardown runs.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.advance(SessionState::Closing);

        if let Some(channel) = self.recognition.lock().await.take() {
            channel.close().await;
        }

        self.advance(SessionState::Closed);

        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.id).await;
        }

        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds() as f64
            / 1000.0;
        info!(
            "session {} closed after {elapsed:.1}s, {} audio frames",
            self.id,
            self.audio_frames.load(Ordering::SeqCst)
        );
    }
}
