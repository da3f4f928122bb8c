//! Google Gemini API Client (API key mode)
//!
//! ## Endpoint URLs
//!
//! | Purpose | URL |
//! |---------|-----|
//! | Generate | `{base}/models/{model}:generateContent?key={GEMINI_API_KEY}` |
//! | Stream | `{base}/models/{model}:streamGenerateContent?alt=sse&key={GEMINI_API_KEY}` |
//!
//! Base URL: `https://generativelanguage.googleapis.com/v1beta`
//!
//! Assistant turns are sent with role `model`; the system text goes in
//! `systemInstruction`.

use async_trait::async_trait;
use reqwest::Client;
use scout_core::http::build_client;
use scout_core::{Error, Result, Role};
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
    /// Google AI Studio (API key mode)
    pub const GOOGLE_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

    pub fn generate(base: &str, model: &str) -> String {
        format!("{}/models/{}:generateContent", base, model)
    }

    pub fn stream(base: &str, model: &str) -> String {
        format!("{}/models/{}:streamGenerateContent", base, model)
    }
}

// =============================================================================
// DATA STRUCTURES
// =============================================================================

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
    #[serde(rename = "modelVersion")]
    model_version: Option<String>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

impl GeminiResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }
}

// =============================================================================
// CLIENT IMPLEMENTATION
// =============================================================================

pub struct GeminiClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: build_client(Client::builder().timeout(REQUEST_TIMEOUT), "Gemini generation"),
            api_key: api_key.into(),
            api_url: endpoints::GOOGLE_AI_BASE_URL.to_string(),
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

    fn build_request(&self, request: &GenerationRequest) -> GeminiRequest {
        let contents = request
            .conversation()
            .map(|turn| GeminiContent {
                role: Some(
                    match turn.role {
                        Role::Assistant => "model",
                        _ => "user",
                    }
                    .to_string(),
                ),
                parts: vec![GeminiPart {
                    text: Some(turn.content.clone()),
                }],
            })
            .collect();

        let system_instruction = request.system_instruction().map(|text| GeminiContent {
            role: None,
            parts: vec![GeminiPart { text: Some(text) }],
        });

        let generation_config =
            if request.max_output_tokens.is_some() || request.temperature.is_some() {
                Some(GenerationConfig {
                    temperature: request.temperature,
                    max_output_tokens: request.max_output_tokens,
                })
            } else {
                None
            };

        GeminiRequest {
            contents,
            system_instruction,
            generation_config,
        }
    }

    async fn send(&self, url: &str, query: &[(&str, &str)], body: &GeminiRequest) -> Result<reqwest::Response> {
        debug!("Gemini request to: {}", url);

        let response = self
            .client
            .post(url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| Error::backend_unavailable(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::generation_failed(format!(
                "Gemini API error {}: {}",
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

    match serde_json::from_str::<GeminiResponse>(&event.data) {
        Ok(response) => {
            if let Some(error) = response.error {
                return SseAction::Fail(format!(
                    "Gemini stream error {}: {}",
                    error.code, error.message
                ));
            }
            let text = response.text();
            if text.is_empty() {
                SseAction::Skip
            } else {
                SseAction::Chunk(text)
            }
        }
        Err(e) => {
            debug!("Ignoring unparseable Gemini event: {}", e);
            SseAction::Skip
        }
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Gemini
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse> {
        info!("Gemini generate: model={}, endpoint={}", self.model, self.api_url);
        let body = self.build_request(&request);
        let url = endpoints::generate(&self.api_url, &self.model);
        let response = self.send(&url, &[], &body).await?;

        let result: GeminiResponse = response.json().await.map_err(|e| {
            Error::generation_failed(format!("Failed to parse Gemini response: {}", e))
        })?;

        if let Some(error) = result.error {
            return Err(Error::generation_failed(format!(
                "Gemini API error {}: {}",
                error.code, error.message
            )));
        }

        Ok(GenerationResponse {
            content: result.text(),
            model: result
                .model_version
                .clone()
                .unwrap_or_else(|| self.model.clone()),
            provider: ProviderType::Gemini.to_string(),
            finish_reason: result
                .candidates
                .first()
                .and_then(|c| c.finish_reason.clone()),
            usage: result
                .usage_metadata
                .map(|u| TokenUsage::new(u.prompt_token_count, u.candidates_token_count)),
        })
    }

    async fn stream_generate(&self, request: GenerationRequest) -> Result<ChunkReceiver> {
        info!("Gemini stream: model={}, endpoint={}", self.model, self.api_url);
        let body = self.build_request(&request);
        let url = endpoints::stream(&self.api_url, &self.model);
        let response = self.send(&url, &[("alt", "sse")], &body).await?;
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
    fn test_roles_and_system_instruction() {
        let client = GeminiClient::new("key", "gemini-1.5-flash");
        let request = GenerationRequest::new(vec![Turn::user("hi"), Turn::assistant("hello")])
            .with_system("You are a scout.");

        let json = serde_json::to_value(client.build_request(&request)).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "You are a scout.");
        assert!(json["systemInstruction"].get("role").is_none());
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_generation_config_carries_token_limit() {
        let client = GeminiClient::new("key", "gemini-1.5-flash");
        let request = GenerationRequest::prompt("x").with_max_output_tokens(400);
        let json = serde_json::to_value(client.build_request(&request)).unwrap();
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 400);
    }

    #[test]
    fn test_endpoint_urls() {
        assert_eq!(
            endpoints::stream("https://x/v1beta", "gemini-1.5-flash"),
            "https://x/v1beta/models/gemini-1.5-flash:streamGenerateContent"
        );
    }

    #[test]
    fn test_map_stream_event() {
        assert_eq!(
            map_stream_event(&event(
                r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Pho"},{"text":"tons"}]}}]}"#
            )),
            SseAction::Chunk("Photons".to_string())
        );
        assert_eq!(
            map_stream_event(&event(r#"{"candidates":[{"finishReason":"STOP"}]}"#)),
            SseAction::Skip
        );
        assert!(matches!(
            map_stream_event(&event(r#"{"error":{"code":429,"message":"quota"}}"#)),
            SseAction::Fail(_)
        ));
    }
}
