//! scout-llm: Generation Backends
//!
//! ## Supported Providers & Endpoints
//!
//! | Provider | Base URL | Auth Method |
//! |----------|----------|-------------|
//! | OpenAI | `https://api.openai.com/v1` | `Bearer {OPENAI_API_KEY}` |
//! | Anthropic | `https://api.anthropic.com/v1` | `x-api-key: {ANTHROPIC_API_KEY}` |
//! | Gemini | `https://generativelanguage.googleapis.com/v1beta` | `?key={GEMINI_API_KEY}` |
//!
//! All three stream over server-sent events; see [`sse`].

pub mod anthropic;
pub mod factory;
pub mod gemini;
pub mod openai;
pub mod provider;
pub mod sse;

pub use anthropic::AnthropicClient;
pub use factory::{create_backend, create_backend_for_model};
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use provider::{
    BoxedBackend, ChunkReceiver, GenerationBackend, GenerationRequest, GenerationResponse,
    ProviderType, TokenUsage,
};

