//! OpenAI Chat Completions Client
//!
//! ## API Endpoints
//!
//! | Endpoint | URL | Purpose |
//! |----------|-----|--------|
//! | Base URL | `https://api.openai.com/v1` | All OpenAI APIs |
//! | Chat | `/chat/completions` | Completions, `stream: true` for SSE |
//!
//! ## Authentication
//! - Header: `Authorization: Bearer {OPENAI_API_KEY}`
//!
//! ## Streaming
//! Each SSE `data:` line carries `choices[0].delta.content`; the stream ends
//! with `data: [DONE]`.

use async_trait::async_trait;
use reqwest::Client;
use scout_core::http::build_client;
use scout_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::provider::{
    ChunkReceiver, GenerationBackend, GenerationRequest, GenerationResponse, ProviderType,
    REQUEST_TIMEOUT, TokenUsage,
};
use crate::sse::{forward_sse, SseAction, SseEvent};

pub mod endpoints {
    pub const BASE_URL: &str = "https://api.openai.com/v1";
    pub const CHAT_COMPLETIONS: &str = "/chat/completions";
    pub const DONE_MARKER: &str = "[DONE]";
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    model: String,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    #[serde(default)]
    delta: OpenAiDelta,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiDelta {
    content: Option<String>,
}

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: build_client(Client::builder().timeout(REQUEST_TIMEOUT), "OpenAI generation"),
            api_key: api_key.into(),
            api_url: endpoints::BASE_URL.to_string(),
            model: model.into(),
        }
    }

    pub fn with_endpoint(
        api_key: impl Into<String>,
        model: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        let mut client = Self::new(api_key, model);
        client.api_url = endpoint.into().trim_end_matches('/').to_string();
        client
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn build_request(&self, request: &GenerationRequest, stream: bool) -> OpenAiRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(OpenAiMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.extend(request.messages.iter().map(|turn| OpenAiMessage {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        }));

        OpenAiRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
            stream,
        }
    }

    async fn send(&self, body: &OpenAiRequest) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.api_url, endpoints::CHAT_COMPLETIONS);
        debug!("OpenAI request to: {} (stream={})", url, body.stream);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::backend_unavailable(format!("OpenAI request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::generation_failed(format!(
                "OpenAI API error {}: {}",
                status, body
            )));
        }

        Ok(response)
    }
}

/// Map one SSE event from the chat completions stream
fn map_stream_event(event: &SseEvent) -> SseAction {
    let data = event.data.trim();
    if data == endpoints::DONE_MARKER {
        return SseAction::Done;
    }
    if data.is_empty() {
        return SseAction::Skip;
    }

    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(_) => return SseAction::Skip,
    };
    if let Some(error) = value.get("error") {
        return SseAction::Fail(format!("OpenAI stream error: {}", error));
    }

    match serde_json::from_value::<OpenAiStreamChunk>(value) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .map(SseAction::Chunk)
            .unwrap_or(SseAction::Skip),
        Err(_) => SseAction::Skip,
    }
}

#[async_trait]
impl GenerationBackend for OpenAiClient {
    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAI
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse> {
        info!("OpenAI generate: model={}, endpoint={}", self.model, self.api_url);
        let body = self.build_request(&request, false);
        let response = self.send(&body).await?;

        let result: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| Error::generation_failed(format!("Failed to parse OpenAI response: {}", e)))?;

        let choice = result
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::generation_failed("OpenAI response had no choices"))?;

        Ok(GenerationResponse {
            content: choice.message.content,
            model: result.model,
            provider: ProviderType::OpenAI.to_string(),
            finish_reason: choice.finish_reason,
            usage: result
                .usage
                .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
        })
    }

    async fn stream_generate(&self, request: GenerationRequest) -> Result<ChunkReceiver> {
        info!("OpenAI stream: model={}, endpoint={}", self.model, self.api_url);
        let body = self.build_request(&request, true);
        let response = self.send(&body).await?;
        Ok(forward_sse(response, map_stream_event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::Turn;

    fn event(data: &str) -> SseEvent {
        SseEvent {
            event: None,
            data: data.to_string(),
        }
    }

    #[test]
    fn test_system_field_leads_messages() {
        let client = OpenAiClient::new("sk-test", "gpt-4-turbo-preview");
        let request = GenerationRequest::new(vec![Turn::user("hi"), Turn::assistant("hello")])
            .with_system("You are a scout.")
            .with_max_output_tokens(1000);

        let body = client.build_request(&request, true);
        let roles: Vec<&str> = body.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant"]);
        assert_eq!(body.max_tokens, Some(1000));

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], true);
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_stream_flag_omitted_for_generate() {
        let client = OpenAiClient::new("sk-test", "gpt-4");
        let body = client.build_request(&GenerationRequest::prompt("x"), false);
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("stream").is_none());
    }

    #[test]
    fn test_map_stream_event() {
        assert_eq!(
            map_stream_event(&event(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#)),
            SseAction::Chunk("Hel".to_string())
        );
        assert_eq!(
            map_stream_event(&event(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#)),
            SseAction::Skip
        );
        assert_eq!(map_stream_event(&event("[DONE]")), SseAction::Done);
        assert!(matches!(
            map_stream_event(&event(r#"{"error":{"message":"rate limited"}}"#)),
            SseAction::Fail(_)
        ));
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let client = OpenAiClient::with_endpoint("k", "m", "http://localhost:9000/v1/");
        assert_eq!(client.api_url(), "http://localhost:9000/v1");
    }
}
