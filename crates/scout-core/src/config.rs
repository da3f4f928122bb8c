//! Configuration
//!
//! Two layers:
//!
//! 1. [`load_environment`] copies `KEY=VALUE` lines from an env file into the
//!    process environment (never overriding variables that are already set).
//! 2. [`ScoutConfig::from_env`] reads the environment once and produces an
//!    explicit config struct that is handed to the orchestrator and to each
//!    backend adapter at construction time.
//!
//! ```rust,no_run
//! use scout_core::config::{load_environment, ScoutConfig};
//!
//! load_environment();
//! let config = ScoutConfig::from_env().expect("valid configuration");
//! config.validate().expect("credential for the selected provider");
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Paths to check (in order of priority)
pub const ENV_FILE_PATHS: &[&str] = &["/etc/paper-scout/environment", ".env"];

pub const DEFAULT_PAPER_SEARCH_PORT: u16 = 8001;
pub const DEFAULT_PDF_SUMMARIZE_PORT: u16 = 8002;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1000;
pub const DEFAULT_ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

/// Load environment variables from the first env file found.
///
/// `SCOUT_ENV_FILE` wins, then [`ENV_FILE_PATHS`] in order. Existing
/// variables are never overridden.
///
/// Returns the path that was loaded, or None if no file was found.
pub fn load_environment() -> Option<String> {
    if let Ok(custom_path) = std::env::var("SCOUT_ENV_FILE") {
        if let Some(path) = load_env_file(&custom_path) {
            return Some(path);
        }
    }

    for path in ENV_FILE_PATHS {
        if let Some(loaded_path) = load_env_file(path) {
            return Some(loaded_path);
        }
    }

    debug!("No environment file found, using existing environment");
    None
}

/// Load one environment file. Returns the path if it was read.
pub fn load_env_file(path: &str) -> Option<String> {
    let path_obj = Path::new(path);

    if !path_obj.exists() {
        return None;
    }

    match fs::read_to_string(path_obj) {
        Ok(content) => {
            let mut loaded_count = 0;
            let mut skipped_count = 0;

            for line in content.lines() {
                let line = line.trim();

                if line.is_empty() || line.starts_with('#') {
                    continue;
                }

                if let Some((key, value)) = parse_env_line(line) {
                    if std::env::var(&key).is_err() {
                        std::env::set_var(&key, &value);
                        loaded_count += 1;
                        debug!("Loaded: {}={}", key, if is_secret(&key) { "***" } else { &value });
                    } else {
                        skipped_count += 1;
                        debug!("Skipped (already set): {}", key);
                    }
                }
            }

            info!(
                "Loaded {} environment variables from {} ({} skipped - already set)",
                loaded_count, path, skipped_count
            );

            Some(path.to_string())
        }
        Err(e) => {
            warn!("Failed to read environment file {}: {}", path, e);
            None
        }
    }
}

fn is_secret(key: &str) -> bool {
    key.contains("KEY") || key.contains("TOKEN") || key.contains("SECRET")
}

/// Parse a single environment line into key-value pair.
fn parse_env_line(line: &str) -> Option<(String, String)> {
    // Handle: KEY=VALUE, KEY="VALUE", KEY='VALUE'
    let mut parts = line.splitn(2, '=');
    let key = parts.next()?.trim();
    let value = parts.next()?.trim();

    if key.is_empty() {
        return None;
    }

    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    Some((key.to_string(), value.to_string()))
}

/// Get an optional configuration value from the process environment.
pub fn get_config_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

// =============================================================================
// TYPED CONFIGURATION
// =============================================================================

/// Generation backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    OpenAI,
    Anthropic,
    Gemini,
}

impl ProviderType {
    /// Environment variable holding this provider's credential
    pub fn api_key_var(&self) -> &'static str {
        match self {
            ProviderType::OpenAI => "OPENAI_API_KEY",
            ProviderType::Anthropic => "ANTHROPIC_API_KEY",
            ProviderType::Gemini => "GEMINI_API_KEY",
        }
    }

    /// Model used when `LLM_MODEL` is not set
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderType::OpenAI => "gpt-4-turbo-preview",
            ProviderType::Anthropic => "claude-3-5-sonnet-20241022",
            ProviderType::Gemini => "gemini-1.5-flash",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderType::OpenAI => write!(f, "openai"),
            ProviderType::Anthropic => write!(f, "anthropic"),
            ProviderType::Gemini => write!(f, "gemini"),
        }
    }
}

impl FromStr for ProviderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "open_ai" => Ok(ProviderType::OpenAI),
            "anthropic" | "claude" => Ok(ProviderType::Anthropic),
            "gemini" | "google" => Ok(ProviderType::Gemini),
            other => Err(Error::config(format!("Unsupported provider: {}", other))),
        }
    }
}

/// How planned tool calls within one turn are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// One after another, in plan order
    #[default]
    Sequential,
    /// Fan-out/fan-in; the call log is still appended in plan order
    Concurrent,
}

impl FromStr for DispatchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sequential" | "serial" => Ok(DispatchMode::Sequential),
            "concurrent" | "parallel" => Ok(DispatchMode::Concurrent),
            other => Err(Error::config(format!("Unknown dispatch mode: {}", other))),
        }
    }
}

/// Generation backend configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: ProviderType,
    pub model: String,
    /// Model used by the PDF summarizer
    pub summary_model: String,
    pub api_key: Option<String>,
    /// Override for the provider's API base URL
    pub base_url: Option<String>,
    pub max_output_tokens: u32,
}

impl LlmConfig {
    pub fn new(provider: ProviderType, api_key: Option<String>) -> Self {
        let model = provider.default_model().to_string();
        Self {
            provider,
            summary_model: model.clone(),
            model,
            api_key,
            base_url: None,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

/// Per-tool network port placeholders (bookkeeping only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolPortsConfig {
    pub paper_search: u16,
    pub pdf_summarize: u16,
}

impl Default for ToolPortsConfig {
    fn default() -> Self {
        Self {
            paper_search: DEFAULT_PAPER_SEARCH_PORT,
            pdf_summarize: DEFAULT_PDF_SUMMARIZE_PORT,
        }
    }
}

/// Complete configuration, built once at startup
#[derive(Debug, Clone)]
pub struct ScoutConfig {
    pub llm: LlmConfig,
    pub ports: ToolPortsConfig,
    pub dispatch: DispatchMode,
    /// Maximum call-log entries kept; `None` keeps every entry
    pub call_log_capacity: Option<usize>,
    pub arxiv_api_url: String,
}

impl ScoutConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(get_config_opt)
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match lookup("LLM_PROVIDER") {
            Some(name) => name.parse()?,
            None => ProviderType::OpenAI,
        };

        let model = lookup("LLM_MODEL").unwrap_or_else(|| provider.default_model().to_string());
        let summary_model = lookup("SUMMARY_MODEL").unwrap_or_else(|| model.clone());

        let llm = LlmConfig {
            provider,
            model,
            summary_model,
            api_key: lookup(provider.api_key_var()),
            base_url: lookup("LLM_BASE_URL"),
            max_output_tokens: parse_or(&lookup, "LLM_MAX_OUTPUT_TOKENS", DEFAULT_MAX_OUTPUT_TOKENS)?,
        };

        let ports = ToolPortsConfig {
            paper_search: parse_or(&lookup, "PAPER_SEARCH_PORT", DEFAULT_PAPER_SEARCH_PORT)?,
            pdf_summarize: parse_or(&lookup, "PDF_SUMMARIZE_PORT", DEFAULT_PDF_SUMMARIZE_PORT)?,
        };

        let dispatch = match lookup("SCOUT_DISPATCH") {
            Some(mode) => mode.parse()?,
            None => DispatchMode::default(),
        };

        let call_log_capacity = match lookup("SCOUT_CALL_LOG_CAPACITY") {
            Some(raw) => Some(parse_value::<usize>("SCOUT_CALL_LOG_CAPACITY", &raw)?),
            None => None,
        };

        Ok(Self {
            llm,
            ports,
            dispatch,
            call_log_capacity,
            arxiv_api_url: lookup("ARXIV_API_URL").unwrap_or_else(|| DEFAULT_ARXIV_API_URL.to_string()),
        })
    }

    /// Fail fast when the selected provider has no credential.
    pub fn validate(&self) -> Result<()> {
        match self.llm.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(()),
            _ => Err(Error::backend_unavailable(format!(
                "API key for {} not found in environment ({})",
                self.llm.provider,
                self.llm.provider.api_key_var()
            ))),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::config(format!("Invalid value for {}: {:?}", key, raw)))
}
