use voice_bridge::{GeminiClient, ResponseGenerator, APOLOGY};

#[tokio::test]
async fn test_unreachable_endpoint_yields_apology() {
    // Discard port: connection refused immediately, no real traffic.
    let client = GeminiClient::new("http://127.0.0.1:9", "test-model", "test-key", "be brief");

    let reply = client.generate("こんにちは").await;
    assert_eq!(reply, APOLOGY);
}

#[tokio::test]
async fn test_failed_turns_do_not_accumulate_context() {
    let client = GeminiClient::new("http://127.0.0.1:9", "test-model", "test-key", "be brief");

    // Repeated failures must each behave identically.
    for _ in 0..3 {
        assert_eq!(client.generate("hi").await, APOLOGY);
    }
}
