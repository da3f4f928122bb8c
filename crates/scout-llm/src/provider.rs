//! Generation backend trait and request/response types
//!
//! A backend turns an ordered list of turns into text, either in one piece
//! ([`GenerationBackend::generate`]) or as a stream of chunks
//! ([`GenerationBackend::stream_generate`]).

use async_trait::async_trait;
use scout_core::{Result, Role, Turn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub use scout_core::ProviderType;

/// Capacity of the chunk channel handed back by `stream_generate`
pub const STREAM_CHANNEL_CAPACITY: usize = 100;

/// Per-request timeout for generation calls
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// One generation call.
///
/// `system` is sent through the provider's dedicated system-instruction
/// field; `messages` are sent in order and never rewritten.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub system: Option<String>,
    pub messages: Vec<Turn>,
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    pub fn new(messages: Vec<Turn>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    /// Single user prompt
    pub fn prompt(content: impl Into<String>) -> Self {
        Self::new(vec![Turn::user(content)])
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Instruction text: the explicit `system` field followed by any
    /// system-role turns, joined by blank lines.
    pub fn system_instruction(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .system
            .iter()
            .map(String::as_str)
            .chain(
                self.messages
                    .iter()
                    .filter(|t| t.role == Role::System)
                    .map(|t| t.content.as_str()),
            )
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }

    /// Non-system turns, in order
    pub fn conversation(&self) -> impl Iterator<Item = &Turn> {
        self.messages.iter().filter(|t| t.role != Role::System)
    }
}

/// Token usage information
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Non-streaming generation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub content: String,
    pub model: String,
    pub provider: String,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// Receiving half of a streaming generation.
///
/// Chunks arrive in order. An `Err` item ends the stream; dropping the
/// receiver cancels the underlying request.
pub type ChunkReceiver = tokio::sync::mpsc::Receiver<Result<String>>;

/// Text generation backend
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Get provider type
    fn provider_type(&self) -> ProviderType;

    /// Model identifier sent with every request
    fn model(&self) -> &str;

    /// Generate a complete response
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse>;

    /// Stream response text chunk by chunk
    async fn stream_generate(&self, request: GenerationRequest) -> Result<ChunkReceiver>;
}

/// Shared backend handle
pub type BoxedBackend = Arc<dyn GenerationBackend>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_instruction_merges_field_and_turns() {
        let request = GenerationRequest::new(vec![
            Turn::system("Be brief."),
            Turn::user("hi"),
        ])
        .with_system("You are a scout.");

        assert_eq!(
            request.system_instruction().as_deref(),
            Some("You are a scout.\n\nBe brief.")
        );
        assert_eq!(request.conversation().count(), 1);
    }

    #[test]
    fn test_no_system_instruction() {
        let request = GenerationRequest::prompt("hello");
        assert!(request.system_instruction().is_none());
        assert_eq!(request.messages, vec![Turn::user("hello")]);
    }

    #[test]
    fn test_usage_totals() {
        assert_eq!(TokenUsage::new(3, 4).total_tokens, 7);
    }
}
