//! Tool-call planning
//!
//! A planner is a pure function from conversation history to an ordered
//! list of tool invocations. [`KeywordPlanner`] is the fixed-rule strategy.

use lazy_static::lazy_static;
use regex::Regex;
use scout_core::{Role, ToolInvocationRequest, Turn};
use scout_tools::builtin::{search, summarize};
use serde_json::{json, Map, Value};
use tracing::debug;

/// Chooses the tool calls for the latest user turn
pub trait ToolPlanner: Send + Sync {
    fn plan(&self, history: &[Turn]) -> Vec<ToolInvocationRequest>;
}

pub const SEARCH_KEYWORDS: &[&str] = &[
    "search",
    "find",
    "papers",
    "research",
    "arxiv",
    "quantum",
    "machine learning",
    "ai",
    "deep learning",
];

pub const SUMMARIZE_KEYWORDS: &[&str] = &["summarize", "summary", "abstract", "explain"];

pub const STOP_WORDS: &[&str] = &[
    "search", "find", "for", "papers", "about", "on", "research", "in", "the", "a", "an",
];

/// Words kept in a synthesized query
pub const MAX_QUERY_WORDS: usize = 6;

pub const SEARCH_MAX_RESULTS: i64 = 5;
pub const SUMMARY_MAX_LENGTH: i64 = 200;

lazy_static! {
    static ref TOOL_CALL_SYNTAX: Regex = Regex::new(r"search_papers\([^)]*\)").unwrap();
    static ref NON_WORD: Regex = Regex::new(r"[^\w\s]").unwrap();
    static ref PDF_URL: Regex = Regex::new(r"https?://[^\s]+\.pdf").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Emit one summarize request per distinct URL instead of per occurrence
    pub dedupe_urls: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self { dedupe_urls: true }
    }
}

/// Keyword-driven planner: search requests first, then summarize requests
#[derive(Debug, Clone, Default)]
pub struct KeywordPlanner {
    config: PlannerConfig,
}

impl KeywordPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Reduce free text to a search query; may return an empty string
    pub fn extract_query(text: &str) -> String {
        let text = TOOL_CALL_SYNTAX.replace_all(text, "");
        let words: Vec<&str> = text
            .split_whitespace()
            .filter(|w| !STOP_WORDS.contains(&w.to_lowercase().as_str()) && w.chars().count() > 1)
            .take(MAX_QUERY_WORDS)
            .collect();
        NON_WORD.replace_all(&words.join(" "), "").trim().to_string()
    }

    /// PDF URLs across the whole history, first-seen order
    pub fn extract_pdf_urls(&self, history: &[Turn]) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        for turn in history {
            for found in PDF_URL.find_iter(&turn.content) {
                let url = found.as_str();
                if self.config.dedupe_urls && urls.iter().any(|u| u == url) {
                    continue;
                }
                urls.push(url.to_string());
            }
        }
        urls
    }
}

fn arguments(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn mentions_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

impl ToolPlanner for KeywordPlanner {
    fn plan(&self, history: &[Turn]) -> Vec<ToolInvocationRequest> {
        let latest = match history.iter().rev().find(|t| t.role == Role::User) {
            Some(turn) => turn,
            None => return Vec::new(),
        };
        let lowered = latest.content.to_lowercase();
        let mut plan = Vec::new();

        if mentions_any(&lowered, SEARCH_KEYWORDS) {
            let query = Self::extract_query(&latest.content);
            if query.is_empty() {
                debug!("Search vocabulary matched but the cleaned query is empty");
            } else {
                plan.push(ToolInvocationRequest::new(
                    search::SOURCE,
                    search::NAME,
                    arguments(json!({"query": query, "max_results": SEARCH_MAX_RESULTS})),
                ));
            }
        }

        if mentions_any(&lowered, SUMMARIZE_KEYWORDS) {
            for url in self.extract_pdf_urls(history) {
                plan.push(ToolInvocationRequest::new(
                    summarize::SOURCE,
                    summarize::NAME,
                    arguments(json!({"pdf_url": url, "max_length": SUMMARY_MAX_LENGTH})),
                ));
            }
        }

        debug!(requests = plan.len(), "Planned tool calls");
        plan
    }
}
