mod common;

use common::{make_session, CountingGenerator};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use voice_bridge::{classify_frame, Config, Session, SessionRegistry, SessionState};

fn final_event(text: &str) -> voice_bridge::RecognitionEvent {
    classify_frame(&format!(r#"A {{"text":"{text}"}}"#)).unwrap()
}

#[tokio::test]
async fn test_audio_before_recognition_is_dropped() {
    let registry = Arc::new(SessionRegistry::new());
    let session = make_session(&registry, "call-1", CountingGenerator::new());

    // No recognition channel open: must not panic, must not queue.
    session.submit_audio(&[0x7f; 160]).await;
    session.submit_audio(&[0x7f; 160]).await;
    assert_eq!(session.audio_frame_count(), 0);
}

#[tokio::test]
async fn test_duplicate_audio_attach_rejected() {
    let registry = Arc::new(SessionRegistry::new());
    let session = make_session(&registry, "call-1", CountingGenerator::new());

    assert!(session.attach_audio_ingest());
    assert!(!session.attach_audio_ingest());
    assert_eq!(session.state(), SessionState::AudioLinked);
}

#[tokio::test]
async fn test_relay_is_single_assignment() {
    let registry = Arc::new(SessionRegistry::new());
    let session = make_session(&registry, "call-1", CountingGenerator::new());

    let (tx1, mut rx1) = mpsc::unbounded_channel();
    let (tx2, mut rx2) = mpsc::unbounded_channel();
    assert!(session.attach_relay(tx1));
    assert!(!session.attach_relay(tx2));

    // Replies go to the original attachment only.
    session.send_relay_text("hello");
    let delivered = rx1.recv().await.unwrap();
    assert!(delivered.contains("hello"));
    // The rejected sender was dropped, so its channel only ever yields None.
    assert!(rx2.recv().await.is_none());
}

#[tokio::test]
async fn test_relay_send_without_attachment_is_noop() {
    let registry = Arc::new(SessionRegistry::new());
    let session = make_session(&registry, "call-1", CountingGenerator::new());

    // Dropped and logged, never an error.
    session.send_relay_text("nobody is listening");
}

#[tokio::test]
async fn test_relay_send_after_receiver_gone_is_noop() {
    let registry = Arc::new(SessionRegistry::new());
    let session = make_session(&registry, "call-1", CountingGenerator::new());

    let (tx, rx) = mpsc::unbounded_channel();
    assert!(session.attach_relay(tx));
    drop(rx);
    session.send_relay_text("into the void");
}

#[tokio::test]
async fn test_final_event_dispatches_exactly_one_reply() {
    let registry = Arc::new(SessionRegistry::new());
    let generator = CountingGenerator::new();
    let session = make_session(&registry, "call-1", Arc::clone(&generator) as _);

    let (tx, mut rx) = mpsc::unbounded_channel();
    session.attach_relay(tx);

    session.on_recognition_event(final_event("予約したいです"));

    let json = timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("reply within deadline")
        .expect("relay still attached");
    let message: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(message["type"], "text");
    assert_eq!(message["token"], "reply to 予約したいです");
    assert_eq!(message["last"], true);
    assert_eq!(message["lang"], "ja-JP");
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test]
async fn test_intermediate_and_status_events_never_dispatch() {
    let registry = Arc::new(SessionRegistry::new());
    let generator = CountingGenerator::new();
    let session = make_session(&registry, "call-1", Arc::clone(&generator) as _);

    let (tx, mut rx) = mpsc::unbounded_channel();
    session.attach_relay(tx);

    // Partial hypothesis.
    session.on_recognition_event(classify_frame(r#"U {"text":"予約し"}"#).unwrap());
    // Final with empty text.
    session.on_recognition_event(classify_frame(r#"A {"text":""}"#).unwrap());
    // Unknown code with text.
    session.on_recognition_event(classify_frame(r#"G {"text":"ping"}"#).unwrap());

    assert!(timeout(Duration::from_millis(150), rx.recv()).await.is_err());
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_concurrent_finals_each_dispatch_once() {
    let registry = Arc::new(SessionRegistry::new());
    let generator = CountingGenerator::new();
    let session = make_session(&registry, "call-1", Arc::clone(&generator) as _);

    let (tx, mut rx) = mpsc::unbounded_channel();
    session.attach_relay(tx);

    session.on_recognition_event(final_event("ひとつめ"));
    session.on_recognition_event(final_event("ふたつめ"));

    // Two replies arrive, order unspecified.
    let mut tokens = Vec::new();
    for _ in 0..2 {
        let json = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("reply within deadline")
            .unwrap();
        let message: serde_json::Value = serde_json::from_str(&json).unwrap();
        tokens.push(message["token"].as_str().unwrap().to_string());
    }
    tokens.sort();
    assert_eq!(tokens, vec!["reply to ひとつめ", "reply to ふたつめ"]);
    assert_eq!(generator.call_count(), 2);
}

#[tokio::test]
async fn test_recognition_never_opens_after_close() {
    // Stand in for the engine endpoint and watch for connection attempts.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (connected_tx, connected_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if listener.accept().await.is_ok() {
            let _ = connected_tx.send(());
        }
    });

    let mut cfg = Config::load("config/voice-bridge").unwrap();
    cfg.recognition.url = format!("ws://{addr}");
    let registry = Arc::new(SessionRegistry::new());
    let session = Session::new(
        "call-1".to_string(),
        Arc::new(cfg),
        Arc::downgrade(&registry),
        CountingGenerator::new(),
    );

    session.close().await;
    session.open_recognition().await;

    assert_eq!(session.state(), SessionState::Closed);
    // A closed session must never reach out to the engine.
    assert!(timeout(Duration::from_millis(300), connected_rx)
        .await
        .is_err());

    // And audio keeps being dropped, not forwarded.
    session.submit_audio(&[0x7f; 160]).await;
    assert_eq!(session.audio_frame_count(), 0);
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let registry = Arc::new(SessionRegistry::new());
    let session = make_session(&registry, "call-1", CountingGenerator::new());
    registry.create(Arc::clone(&session)).await.unwrap();

    // Both connection handlers racing into teardown.
    tokio::join!(session.close(), session.close());

    assert_eq!(session.state(), SessionState::Closed);
    assert!(registry.get("call-1").await.is_none());
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_state_never_regresses_after_close() {
    let registry = Arc::new(SessionRegistry::new());
    let session = make_session(&registry, "call-1", CountingGenerator::new());

    session.close().await;
    assert_eq!(session.state(), SessionState::Closed);

    session.attach_audio_ingest();
    let (tx, _rx) = mpsc::unbounded_channel();
    session.attach_relay(tx);
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_lifecycle_advances_as_links_attach() {
    let registry = Arc::new(SessionRegistry::new());
    let session = make_session(&registry, "call-1", CountingGenerator::new());
    assert_eq!(session.state(), SessionState::Created);

    session.attach_audio_ingest();
    assert_eq!(session.state(), SessionState::AudioLinked);

    let (tx, _rx) = mpsc::unbounded_channel();
    session.attach_relay(tx);
    // No recognition link yet, so the session is not Active.
    assert_eq!(session.state(), SessionState::RelayLinked);
}
