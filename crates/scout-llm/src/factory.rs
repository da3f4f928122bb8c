//! Backend construction from configuration

use scout_core::{Error, LlmConfig, ProviderType, Result};
use std::sync::Arc;
use tracing::info;

use crate::anthropic::AnthropicClient;
use crate::gemini::GeminiClient;
use crate::openai::OpenAiClient;
use crate::provider::BoxedBackend;

/// Build the conversation backend selected by `config`
pub fn create_backend(config: &LlmConfig) -> Result<BoxedBackend> {
    create_backend_for_model(config, &config.model)
}

/// Build a backend for the configured provider but an explicit model,
/// e.g. the summarizer's `SUMMARY_MODEL`.
pub fn create_backend_for_model(config: &LlmConfig, model: &str) -> Result<BoxedBackend> {
    let api_key = config
        .api_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            Error::backend_unavailable(format!(
                "{} is not set for provider {}",
                config.provider.api_key_var(),
                config.provider
            ))
        })?;

    info!(
        "Creating {} backend: model={}, endpoint={}",
        config.provider,
        model,
        config.base_url.as_deref().unwrap_or("default")
    );

    let backend: BoxedBackend = match config.provider {
        ProviderType::OpenAI => Arc::new(match &config.base_url {
            Some(url) => OpenAiClient::with_endpoint(api_key, model, url),
            None => OpenAiClient::new(api_key, model),
        }),
        ProviderType::Anthropic => Arc::new(
            match &config.base_url {
                Some(url) => AnthropicClient::with_endpoint(api_key, model, url),
                None => AnthropicClient::new(api_key, model),
            }
            .with_default_max_tokens(config.max_output_tokens),
        ),
        ProviderType::Gemini => Arc::new(match &config.base_url {
            Some(url) => GeminiClient::with_endpoint(api_key, model, url),
            None => GeminiClient::new(api_key, model),
        }),
    };

    Ok(backend)
}
