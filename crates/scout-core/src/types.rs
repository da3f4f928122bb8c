//! Common types used across paper-scout

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in the conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// A planned tool call: which (source, tool) pair to run and with what arguments.
///
/// Fields are read-only once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    source: String,
    tool: String,
    arguments: Map<String, Value>,
}

impl ToolInvocationRequest {
    pub fn new(
        source: impl Into<String>,
        tool: impl Into<String>,
        arguments: Map<String, Value>,
    ) -> Self {
        Self {
            source: source.into(),
            tool: tool.into(),
            arguments,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn arguments(&self) -> &Map<String, Value> {
        &self.arguments
    }

    /// `source.tool`, as shown in trace output
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.source, self.tool)
    }
}

/// Outcome of a single tool invocation. Failures are data, never panics or errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationResult {
    pub source: String,
    pub tool: String,
    pub success: bool,
    pub payload: Option<Value>,
    pub error: Option<String>,
}

impl ToolInvocationResult {
    pub fn succeeded(source: impl Into<String>, tool: impl Into<String>, payload: Value) -> Self {
        Self {
            source: source.into(),
            tool: tool.into(),
            success: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn failed(source: impl Into<String>, tool: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            tool: tool.into(),
            success: false,
            payload: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_turn_serializes_lowercase_role() {
        let value = serde_json::to_value(Turn::assistant("hi")).unwrap();
        assert_eq!(value, json!({"role": "assistant", "content": "hi"}));
    }

    #[test]
    fn test_request_qualified_name() {
        let request = ToolInvocationRequest::new("paper_search", "search_papers", Map::new());
        assert_eq!(request.qualified_name(), "paper_search.search_papers");
    }

    #[test]
    fn test_failed_result_has_no_payload() {
        let result = ToolInvocationResult::failed("pdf_summarize", "summarize_pdf", "boom");
        assert!(!result.success);
        assert!(result.payload.is_none());
        assert_eq!(result.error.as_deref(), Some("boom"));
    }
}
