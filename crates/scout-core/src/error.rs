//! Error types for paper-scout

use thiserror::Error;

/// Main error type for paper-scout operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown tool: {source_name}/{tool}")]
    UnknownTool { source_name: String, tool: String },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an unknown tool error for a (source, tool) pair
    pub fn unknown_tool(source: impl Into<String>, tool: impl Into<String>) -> Self {
        Error::UnknownTool {
            source_name: source.into(),
            tool: tool.into(),
        }
    }

    /// Create an invalid arguments error
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Error::InvalidArguments(msg.into())
    }

    /// Create a backend unavailable error
    pub fn backend_unavailable(msg: impl Into<String>) -> Self {
        Error::BackendUnavailable(msg.into())
    }

    /// Create an extraction failed error
    pub fn extraction_failed(msg: impl Into<String>) -> Self {
        Error::ExtractionFailed(msg.into())
    }

    /// Create a generation failed error
    pub fn generation_failed(msg: impl Into<String>) -> Self {
        Error::GenerationFailed(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }
}
