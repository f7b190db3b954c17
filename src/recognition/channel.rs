use super::event::{classify_frame, RecognitionEvent};
use crate::error::BridgeError;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Session-start control line for the engine.
///
/// `MULAW` keeps the caller's 8kHz mu-law audio in its native encoding;
/// `resultUpdatedInterval` makes the engine emit intermediate hypotheses.
pub fn start_command(engine: &str, appkey: &str) -> String {
    format!("s MULAW {engine} authorization={appkey} output=json resultUpdatedInterval=500")
}

/// One streaming connection to the recognition engine.
///
/// Owned by exactly one session and never reused after close. Classified
/// events are pushed into the channel given to [`RecognitionChannel::open`]
/// in arrival order; the receive loop ends when the connection does.
pub struct RecognitionChannel {
    writer: Mutex<WsSink>,
    closed: AtomicBool,
}

impl RecognitionChannel {
    /// Connect, send the session-start control line, and spawn the receive
    /// loop. A handshake that cannot complete is `ChannelUnavailable`; retry
    /// policy (currently: none) belongs to the caller.
    pub async fn open(
        url: &str,
        start_command: &str,
        events: mpsc::UnboundedSender<RecognitionEvent>,
    ) -> Result<Self, BridgeError> {
        let (ws, _) = connect_async(url)
            .await
            .map_err(|e| BridgeError::ChannelUnavailable(e.to_string()))?;

        let (mut writer, reader) = ws.split();
        writer
            .send(Message::Text(start_command.to_string()))
            .await
            .map_err(|e| BridgeError::ChannelUnavailable(format!("start command rejected: {e}")))?;

        info!("recognition channel open");
        tokio::spawn(receive_loop(reader, events));

        Ok(Self {
            writer: Mutex::new(writer),
            closed: AtomicBool::new(false),
        })
    }

    /// Frame and transmit one chunk of raw mu-law audio: a one-byte `p`
    /// marker followed by the bytes, untranscoded.
    pub async fn send_audio(&self, chunk: &[u8]) -> Result<(), BridgeError> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }

        let mut frame = Vec::with_capacity(chunk.len() + 1);
        frame.push(b'p');
        frame.extend_from_slice(chunk);

        self.writer
            .lock()
            .await
            .send(Message::Binary(frame))
            .await
            .map_err(|e| BridgeError::TransmissionFailure {
                link: "recognition",
                reason: e.to_string(),
            })
    }

    /// Send the session-end control line best-effort and drop the
    /// connection. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut writer = self.writer.lock().await;
        let _ = writer.send(Message::Text("e".to_string())).await;
        let _ = writer.close().await;
        info!("recognition channel closed");
    }
}

/// Read frames until the connection closes, classifying each and delivering
/// the result in arrival order. No reordering, no batching.
async fn receive_loop(mut reader: WsSource, events: mpsc::UnboundedSender<RecognitionEvent>) {
    while let Some(frame) = reader.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => {
                    warn!("discarding non-UTF-8 recognition frame: {e}");
                    continue;
                }
            },
            Ok(Message::Close(_)) => break,
            // Ping/pong are answered by tungstenite itself.
            Ok(_) => continue,
            Err(e) => {
                warn!("recognition connection lost: {e}");
                break;
            }
        };

        if let Some(event) = classify_frame(&text) {
            if events.send(event).is_err() {
                // Session side is gone; nothing left to deliver to.
                break;
            }
        }
    }

    debug!("recognition receive loop ended");
}
