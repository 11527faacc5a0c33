//! OpenAI adapters: structured generation over Chat Completions and
//! speech-to-text over the audio transcription endpoint.
//!
//! Both talk plain HTTP through `reqwest`; any OpenAI-compatible server can be
//! targeted with [`OpenAiConfig::with_base_url`].

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use tracing::debug;

use crate::domain::{Result, TaskerError};
use crate::ports::{AudioClip, GenerationRequest, StructuredGenerator, Transcriber};

/// Default API origin.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Connection settings shared by both adapters.
#[derive(Clone)]
pub struct OpenAiConfig {
    /// API key for the `Authorization: Bearer` header.
    pub api_key: String,
    /// Origin without a trailing slash (defaults to [`DEFAULT_BASE_URL`]).
    pub base_url: String,
    pub model: String,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            model: model.into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Build the Chat Completions body for one structured-generation request.
pub fn build_completions_request(model: &str, request: &GenerationRequest) -> Value {
    json!({
        "model": model,
        "messages": [
            {"role": "system", "content": request.instructions},
            {"role": "user", "content": request.input.to_string()},
        ],
        "response_format": {
            "type": "json_schema",
            "json_schema": {
                "name": schema_name(request.prompt_name),
                "schema": request.output_schema,
            }
        }
    })
}

/// `response_format` names only allow `[a-zA-Z0-9_-]`.
fn schema_name(prompt_name: &str) -> String {
    prompt_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Pull the JSON answer out of a Chat Completions response.
fn parse_completion(prompt_name: &str, body: &Value) -> Result<Value> {
    let message = body
        .pointer("/choices/0/message")
        .ok_or_else(|| TaskerError::Generation("response has no choices".into()))?;
    if let Some(refusal) = message.get("refusal").and_then(Value::as_str) {
        return Err(TaskerError::Generation(format!("model refused: {refusal}")));
    }
    let content = message
        .get("content")
        .and_then(Value::as_str)
        .ok_or_else(|| TaskerError::schema_violation(prompt_name, "response has no content"))?;
    serde_json::from_str(content)
        .map_err(|e| TaskerError::schema_violation(prompt_name, format!("content is not JSON: {e}")))
}

/// Map an HTTP error status to a message naming the status.
fn http_error_message(status: reqwest::StatusCode, body: &str) -> String {
    let message = extract_error_message(body);
    match status.as_u16() {
        401 => format!("OpenAI authentication failed: {message}"),
        429 => format!("OpenAI rate limited: {message}"),
        code => format!("OpenAI HTTP {code}: {message}"),
    }
}

/// Extract an error message from an OpenAI error response body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

/// StructuredGenerator backed by `/v1/chat/completions` with a JSON schema
/// response format.
#[derive(Debug)]
pub struct OpenAiGenerator {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiGenerator {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl StructuredGenerator for OpenAiGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<Value> {
        let body = build_completions_request(&self.config.model, &request);
        debug!(prompt = request.prompt_name, model = %self.config.model, "sending completion request");

        let response = self
            .client
            .post(self.config.endpoint("/v1/chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TaskerError::Generation(format!("OpenAI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TaskerError::Generation(http_error_message(status, &text)));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| TaskerError::Generation(format!("invalid OpenAI response: {e}")))?;
        parse_completion(request.prompt_name, &payload)
    }
}

/// Transcriber backed by `/v1/audio/transcriptions`.
#[derive(Debug)]
pub struct OpenAiTranscriber {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiTranscriber {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(&self, audio: &AudioClip) -> Result<String> {
        let file = Part::bytes(audio.bytes.clone())
            .file_name(format!("audio.{}", audio.file_extension()))
            .mime_str(&audio.mime_type)
            .map_err(|e| TaskerError::Transcription(format!("invalid audio MIME type: {e}")))?;
        let form = Form::new()
            .text("model", self.config.model.clone())
            .part("file", file);
        debug!(bytes = audio.bytes.len(), mime = %audio.mime_type, "sending transcription request");

        let response = self
            .client
            .post(self.config.endpoint("/v1/audio/transcriptions"))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TaskerError::Transcription(format!("OpenAI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TaskerError::Transcription(http_error_message(status, &text)));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| TaskerError::Transcription(format!("invalid OpenAI response: {e}")))?;
        let text = payload
            .get("text")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if text.is_empty() {
            return Err(TaskerError::Transcription("transcription came back empty".into()));
        }
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt_name: "voicetask.intent.disambiguate.v1",
            instructions: "Decide".into(),
            input: json!({"commandText": "buy milk"}),
            output_schema: json!({"type": "object"}),
        }
    }

    #[test]
    fn config_trims_trailing_slash() {
        let config = OpenAiConfig::new("k", "m").with_base_url("http://localhost:8080/");
        assert_eq!(
            config.endpoint("/v1/chat/completions"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn completions_request_carries_schema_and_input() {
        let body = build_completions_request("gpt-4o-mini", &request());
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["content"], "Decide");
        assert_eq!(body["messages"][1]["content"], r#"{"commandText":"buy milk"}"#);
        assert_eq!(
            body["response_format"]["json_schema"]["name"],
            "voicetask_intent_disambiguate_v1"
        );
    }

    #[test]
    fn completion_content_must_be_json() {
        let ok = json!({"choices": [{"message": {"content": "{\"a\":1}"}}]});
        assert_eq!(parse_completion("p", &ok).unwrap(), json!({"a": 1}));

        let bad = json!({"choices": [{"message": {"content": "sure!"}}]});
        assert!(matches!(
            parse_completion("p", &bad),
            Err(TaskerError::SchemaViolation { .. })
        ));

        let refused = json!({"choices": [{"message": {"content": null, "refusal": "no"}}]});
        assert!(matches!(
            parse_completion("p", &refused),
            Err(TaskerError::Generation(_))
        ));
    }

    #[test]
    fn error_message_prefers_api_message() {
        let body = r#"{"error": {"message": "Invalid API key"}}"#;
        assert_eq!(
            http_error_message(reqwest::StatusCode::UNAUTHORIZED, body),
            "OpenAI authentication failed: Invalid API key"
        );
        assert_eq!(
            http_error_message(reqwest::StatusCode::BAD_GATEWAY, "upstream"),
            "OpenAI HTTP 502: upstream"
        );
    }
}
