//! Google Gemini API implementation.
//!
//! Communicates with
//! `{base}/models/{model}:streamGenerateContent?alt=sse`.
//! Responses are normalized to [`StreamEvent`]s: text parts become
//! `TextDelta`, a successful finish reason becomes `Done`, and error
//! payloads or abnormal finish reasons become `Error`.

use serde::Deserialize;
use serde_json::json;

use crate::{
    ApiConfig, ChatMessage, Result, SseParseAction, SseParser, StreamEvent, client_for, mpsc,
    process_sse_stream, read_capped_error_body, send_event, stream_idle_timeout,
};

fn build_request_body(config: &ApiConfig, messages: &[ChatMessage]) -> serde_json::Value {
    let contents: Vec<serde_json::Value> = messages
        .iter()
        .map(|message| {
            json!({
                "role": message.role.as_wire_str(),
                "parts": [{ "text": message.text }],
            })
        })
        .collect();

    let generation = config.generation();
    json!({
        "contents": contents,
        "generationConfig": {
            "temperature": generation.temperature,
            "maxOutputTokens": generation.max_output_tokens,
            "responseMimeType": "text/plain",
        },
    })
}

pub(crate) async fn send_message(
    config: &ApiConfig,
    messages: &[ChatMessage],
    tx: &mpsc::Sender<StreamEvent>,
) -> Result<()> {
    let url = format!(
        "{}/models/{}:streamGenerateContent?alt=sse",
        config.base_url(),
        config.model()
    );
    let body = build_request_body(config, messages);

    let response = match client_for(config.base_url())
        .post(&url)
        .header("x-goog-api-key", config.api_key())
        .json(&body)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            let _ = send_event(tx, StreamEvent::Error(format!("Request failed: {e}"))).await;
            return Ok(());
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        let error_text = read_capped_error_body(response).await;
        let _ = send_event(
            tx,
            StreamEvent::Error(format!("API error {status}: {error_text}")),
        )
        .await;
        return Ok(());
    }

    let mut parser = GeminiParser;
    process_sse_stream(response, &mut parser, tx, stream_idle_timeout()).await
}

mod typed {
    use super::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct Response {
        pub error: Option<ApiError>,
        pub candidates: Option<Vec<Candidate>>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct ApiError {
        pub message: Option<String>,
    }

    impl ApiError {
        pub(super) fn message_or_default(&self) -> &str {
            self.message.as_deref().unwrap_or("unknown Gemini API error")
        }
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct Candidate {
        pub content: Option<Content>,
        pub finish_reason: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct Content {
        pub parts: Option<Vec<Part>>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct Part {
        pub text: Option<String>,
    }

    /// Gemini finish reasons that matter for stream termination.
    #[derive(Debug, PartialEq, Eq)]
    pub(super) enum FinishReason {
        Stop,
        Abnormal(String),
    }

    impl FinishReason {
        pub(super) fn parse(raw: &str) -> Self {
            match raw {
                "STOP" => FinishReason::Stop,
                other => FinishReason::Abnormal(other.to_string()),
            }
        }
    }
}

struct GeminiParser;

impl SseParser for GeminiParser {
    fn parse(&mut self, json: &serde_json::Value) -> SseParseAction {
        let response: typed::Response = match serde_json::from_value(json.clone()) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(%e, "Failed to parse Gemini SSE event");
                return SseParseAction::Continue;
            }
        };

        if let Some(error) = response.error {
            return SseParseAction::Error(error.message_or_default().to_string());
        }

        let mut events = Vec::new();
        let mut finish_action: Option<SseParseAction> = None;

        if let Some(candidates) = response.candidates {
            for candidate in candidates {
                // Content parts are processed before the finish reason so
                // the final chunk's text is never dropped.
                if let Some(content) = candidate.content
                    && let Some(parts) = content.parts
                {
                    for part in parts {
                        if let Some(text) = part.text {
                            events.push(StreamEvent::TextDelta(text));
                        }
                    }
                }

                if let Some(reason) = candidate.finish_reason {
                    finish_action = Some(match typed::FinishReason::parse(&reason) {
                        typed::FinishReason::Stop => SseParseAction::Done,
                        typed::FinishReason::Abnormal(r) => {
                            SseParseAction::Error(format!("Stream finished abnormally: {r}"))
                        }
                    });
                }
            }
        }

        if let Some(action) = finish_action {
            if events.is_empty() {
                return action;
            }
            match action {
                SseParseAction::Done => events.push(StreamEvent::Done),
                SseParseAction::Error(msg) => events.push(StreamEvent::Error(msg)),
                _ => {}
            }
            return SseParseAction::Emit(events);
        }

        if events.is_empty() {
            SseParseAction::Continue
        } else {
            SseParseAction::Emit(events)
        }
    }

    fn provider_name(&self) -> &'static str {
        "Gemini"
    }
}
