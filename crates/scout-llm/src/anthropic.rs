//! Anthropic Claude API Client
//!
//! ## API Endpoints
//!
//! | Endpoint | URL | Purpose |
//! |----------|-----|--------|
//! | Base URL | `https://api.anthropic.com/v1` | All Claude APIs |
//! | Messages | `/messages` | Completions, `stream: true` for SSE |
//!
//! ## Authentication
//! - Header: `x-api-key: {ANTHROPIC_API_KEY}`
//! - Header: `anthropic-version: 2023-06-01`
//!
//! ## Streaming
//! Text arrives in `content_block_delta` events with a `text_delta` payload.
//! `message_stop` ends the stream; an `error` event fails it.

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

// =============================================================================
// API ENDPOINT CONFIGURATION
// =============================================================================

pub mod endpoints {
    pub const BASE_URL: &str = "https://api.anthropic.com/v1";
    pub const MESSAGES: &str = "/messages";
    pub const API_VERSION: &str = "2023-06-01";
}

/// `max_tokens` is mandatory for this API
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

// =============================================================================
// DATA STRUCTURES
// =============================================================================

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ResponseContentBlock>,
    model: String,
    stop_reason: Option<String>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum StreamEvent {
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { delta: StreamDelta },
    #[serde(rename = "message_stop")]
    MessageStop,
    #[serde(rename = "error")]
    Error { error: StreamError },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum StreamDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

// =============================================================================
// CLIENT IMPLEMENTATION
// =============================================================================

pub struct AnthropicClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    default_max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: build_client(Client::builder().timeout(REQUEST_TIMEOUT), "Anthropic generation"),
            api_key: api_key.into(),
            api_url: endpoints::BASE_URL.to_string(),
            model: model.into(),
            default_max_tokens: DEFAULT_MAX_TOKENS,
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

    /// `max_tokens` used when a request does not set one
    pub fn with_default_max_tokens(mut self, tokens: u32) -> Self {
        self.default_max_tokens = tokens;
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn build_request(&self, request: &GenerationRequest, stream: bool) -> AnthropicRequest {
        // System turns go to the top-level field; the rest keep their order.
        let messages = request
            .conversation()
            .map(|turn| AnthropicMessage {
                role: turn.role.as_str().to_string(),
                content: turn.content.clone(),
            })
            .collect();

        AnthropicRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_output_tokens.unwrap_or(self.default_max_tokens),
            system: request.system_instruction(),
            temperature: request.temperature,
            stream,
        }
    }

    async fn send(&self, body: &AnthropicRequest) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.api_url, endpoints::MESSAGES);
        debug!("Anthropic request to: {} (stream={})", url, body.stream);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", endpoints::API_VERSION)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| Error::backend_unavailable(format!("Anthropic request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::generation_failed(format!(
                "Anthropic API error {}: {}",
                status, body
            )));
        }

        Ok(response)
    }
}

fn map_stream_event(event: &SseEvent) -> SseAction {
    if event.data.trim().is_empty() {
        return SseAction::Skip;
    }

    match serde_json::from_str::<StreamEvent>(&event.data) {
        Ok(StreamEvent::ContentBlockDelta {
            delta: StreamDelta::TextDelta { text },
        }) => SseAction::Chunk(text),
        Ok(StreamEvent::MessageStop) => SseAction::Done,
        Ok(StreamEvent::Error { error }) => {
            SseAction::Fail(format!("Anthropic stream error ({}): {}", error.kind, error.message))
        }
        Ok(_) => SseAction::Skip,
        Err(e) => {
            debug!("Ignoring unparseable Anthropic event: {}", e);
            SseAction::Skip
        }
    }
}

#[async_trait]
impl GenerationBackend for AnthropicClient {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse> {
        info!("Anthropic generate: model={}, endpoint={}", self.model, self.api_url);
        let body = self.build_request(&request, false);
        let response = self.send(&body).await?;

        let result: AnthropicResponse = response.json().await.map_err(|e| {
            Error::generation_failed(format!("Failed to parse Anthropic response: {}", e))
        })?;

        let text: String = result
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(text),
                ResponseContentBlock::Other => None,
            })
            .collect();

        Ok(GenerationResponse {
            content: text,
            model: result.model,
            provider: ProviderType::Anthropic.to_string(),
            finish_reason: result.stop_reason,
            usage: result
                .usage
                .map(|u| TokenUsage::new(u.input_tokens, u.output_tokens)),
        })
    }

    async fn stream_generate(&self, request: GenerationRequest) -> Result<ChunkReceiver> {
        info!("Anthropic stream: model={}, endpoint={}", self.model, self.api_url);
        let body = self.build_request(&request, true);
        let response = self.send(&body).await?;
        Ok(forward_sse(response, map_stream_event))
    }
}
