//! Core types and utilities for paper-scout
//!
//! # Modules
//!
//! - `config`: Environment loading and the `ScoutConfig` passed to every component
//! - `error`: Error taxonomy and Result alias
//! - `http`: HTTP client construction with a logged fallback
//! - `text`: Character-safe truncation
//! - `types`: Conversation turns and tool invocation request/result types

pub mod config;
pub mod error;
pub mod http;
pub mod text;
pub mod types;

// Re-exports
pub use config::{DispatchMode, LlmConfig, ProviderType, ScoutConfig, ToolPortsConfig};
pub use error::{Error, Result};
pub use types::*;
