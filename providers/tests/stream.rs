//! Streaming round-trip tests against a mock Gemini endpoint.

use quill_providers::{ApiConfig, ChatMessage, send_message};
use quill_types::StreamEvent;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn collect_events(config: &ApiConfig, messages: &[ChatMessage]) -> Vec<StreamEvent> {
    let (tx, mut rx) = mpsc::channel(64);
    send_message(config, messages, tx).await.expect("send_message");
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn sse_body(payloads: &[&str]) -> String {
    payloads
        .iter()
        .map(|p| format!("data: {p}\n\n"))
        .collect::<String>()
}

#[tokio::test]
async fn streams_text_deltas_then_done() {
    let server = MockServer::start().await;
    let body = sse_body(&[
        r#"{"candidates":[{"content":{"parts":[{"text":"Hello "}]}}]}"#,
        r#"{"candidates":[{"content":{"parts":[{"text":"world"}]},"finishReason":"STOP"}]}"#,
    ]);
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:streamGenerateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let config = ApiConfig::new("test-key", "gemini-2.0-flash")
        .unwrap()
        .with_base_url(server.uri());
    let events = collect_events(&config, &[ChatMessage::user("hi")]).await;

    assert_eq!(
        events,
        vec![
            StreamEvent::TextDelta("Hello ".into()),
            StreamEvent::TextDelta("world".into()),
            StreamEvent::Done,
        ]
    );
}

#[tokio::test]
async fn http_error_becomes_stream_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429).set_body_string(r#"{"error":{"message":"rate limited"}}"#),
        )
        .mount(&server)
        .await;

    let config = ApiConfig::new("test-key", "gemini-2.0-flash")
        .unwrap()
        .with_base_url(server.uri());
    let events = collect_events(&config, &[ChatMessage::user("hi")]).await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        StreamEvent::Error(msg) => {
            assert!(msg.contains("429"), "unexpected error: {msg}");
        }
        other => panic!("expected Error, got {other:?}"),
    }
}

#[tokio::test]
async fn truncated_stream_reports_premature_close() {
    let server = MockServer::start().await;
    // No finishReason and no further events: the connection closes early.
    let body = sse_body(&[r#"{"candidates":[{"content":{"parts":[{"text":"partial"}]}}]}"#]);
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let config = ApiConfig::new("test-key", "gemini-2.0-flash")
        .unwrap()
        .with_base_url(server.uri());
    let events = collect_events(&config, &[ChatMessage::user("hi")]).await;

    assert_eq!(events[0], StreamEvent::TextDelta("partial".into()));
    match events.last() {
        Some(StreamEvent::Error(msg)) => {
            assert!(msg.contains("closed before stream completed"), "got: {msg}");
        }
        other => panic!("expected trailing Error, got {other:?}"),
    }
}
