//! OpenAI adapter contract tests
//!
//! Verify the HTTP shape of the structured-generation and transcription
//! adapters against a mock server: request format, response parsing, and
//! error mapping onto `TaskerError`.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::json;
use voicetask_core::app::IntentRequest;
use voicetask_core::app::IntentResolver;
use voicetask_core::domain::{IntentResolution, TaskerError};
use voicetask_core::impls::{OpenAiConfig, OpenAiGenerator, OpenAiTranscriber};
use voicetask_core::ports::{AudioClip, GenerationRequest, StructuredGenerator, Transcriber};
use voicetask_core::typed::TypedGenerator;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1722506400,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

fn request() -> GenerationRequest {
    GenerationRequest {
        prompt_name: "voicetask.time.extract.v1",
        instructions: "Extract the due time.".into(),
        input: json!({"taskText": "call mom at 5pm"}),
        output_schema: json!({"type": "object"}),
    }
}

fn generator(server: &MockServer) -> OpenAiGenerator {
    OpenAiGenerator::new(OpenAiConfig::new("test-key", "gpt-4o-mini").with_base_url(server.uri()))
}

fn transcriber(server: &MockServer) -> OpenAiTranscriber {
    OpenAiTranscriber::new(OpenAiConfig::new("test-key", "whisper-1").with_base_url(server.uri()))
}

fn clip() -> AudioClip {
    AudioClip::new("audio/webm", vec![0x1a, 0x45, 0xdf, 0xa3])
}

// ────────────────────────────────────────────────────────────────────────────
// Structured generation
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn generation_request_carries_schema_and_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "response_format": {
                "type": "json_schema",
                "json_schema": {"name": "voicetask_time_extract_v1"}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(r#"{"ok":true}"#)))
        .expect(1)
        .mount(&server)
        .await;

    let value = generator(&server).generate(request()).await.unwrap();
    assert_eq!(value, json!({"ok": true}));
}

#[tokio::test]
async fn non_json_content_is_schema_violation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("sure, at 5pm")))
        .mount(&server)
        .await;

    let err = generator(&server).generate(request()).await.unwrap_err();
    assert!(matches!(err, TaskerError::SchemaViolation { .. }), "{err:?}");
}

#[tokio::test]
async fn refusal_is_generation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": null, "refusal": "I can't help with that."},
                "finish_reason": "stop"
            }]
        })))
        .mount(&server)
        .await;

    let err = generator(&server).generate(request()).await.unwrap_err();
    let TaskerError::Generation(message) = err else {
        panic!("expected generation error, got {err:?}");
    };
    assert!(message.contains("I can't help with that."));
}

#[tokio::test]
async fn http_errors_name_the_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let err = generator(&server).generate(request()).await.unwrap_err();
    let TaskerError::Generation(message) = err else {
        panic!("expected generation error, got {err:?}");
    };
    assert_eq!(message, "OpenAI authentication failed: Incorrect API key provided");
}

#[tokio::test]
async fn server_error_with_plain_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = generator(&server).generate(request()).await.unwrap_err();
    let TaskerError::Generation(message) = err else {
        panic!("expected generation error, got {err:?}");
    };
    assert_eq!(message, "OpenAI HTTP 503: upstream unavailable");
}

#[tokio::test]
async fn intent_resolver_over_http_with_no_tasks() {
    let server = MockServer::start().await;
    let due = Utc.with_ymd_and_hms(2024, 8, 1, 17, 0, 0).unwrap();
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "response_format": {"json_schema": {"name": "voicetask_time_extract_v1"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            &json!({
                "parsedDueAtTimestamp": due.timestamp_millis(),
                "extractedTimeDescription": "Today at 5 PM"
            })
            .to_string(),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = IntentResolver::new(TypedGenerator::new(Arc::new(generator(&server))));
    let resolution = resolver
        .resolve(&IntentRequest {
            command_text: "call mom at 5pm".into(),
            reference_time: Utc.with_ymd_and_hms(2024, 8, 1, 10, 0, 0).unwrap(),
            existing: Vec::new(),
        })
        .await;

    let IntentResolution::Resolved(proposal) = resolution else {
        panic!("expected a resolved proposal");
    };
    assert!(!proposal.is_edit);
    assert_eq!(proposal.text, "call mom at 5pm");
    assert_eq!(proposal.due_at, Some(due));
    assert_eq!(proposal.time_description.as_deref(), Some("Today at 5 PM"));
}

// ────────────────────────────────────────────────────────────────────────────
// Transcription
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn transcription_returns_trimmed_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"text": "  Buy groceries tomorrow \n"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let text = transcriber(&server).transcribe(&clip()).await.unwrap();
    assert_eq!(text, "Buy groceries tomorrow");
}

#[tokio::test]
async fn empty_transcription_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "   "})))
        .mount(&server)
        .await;

    let err = transcriber(&server).transcribe(&clip()).await.unwrap_err();
    assert!(matches!(err, TaskerError::Transcription(_)), "{err:?}");
}

#[tokio::test]
async fn transcription_rate_limit_is_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "Rate limit reached", "type": "requests"}
        })))
        .mount(&server)
        .await;

    let err = transcriber(&server).transcribe(&clip()).await.unwrap_err();
    let TaskerError::Transcription(message) = err else {
        panic!("expected transcription error, got {err:?}");
    };
    assert_eq!(message, "OpenAI rate limited: Rate limit reached");
}
