use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use uuid::Uuid;

/// Record of a single tool invocation attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallLogEntry {
    /// Unique entry ID
    pub id: String,

    /// When the invocation started
    pub timestamp: DateTime<Utc>,

    /// Tool source (server) name
    pub source: String,

    /// Tool name
    pub tool: String,

    /// Arguments exactly as dispatched
    pub arguments: Map<String, Value>,

    /// Wall-clock latency of the attempt
    pub latency_seconds: f64,

    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CallLogEntry {
    /// Build an entry for an attempt that started at `started_at` and took `elapsed`.
    pub fn new(
        started_at: DateTime<Utc>,
        source: impl Into<String>,
        tool: impl Into<String>,
        arguments: Map<String, Value>,
        elapsed: Duration,
        error: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: started_at,
            source: source.into(),
            tool: tool.into(),
            arguments,
            latency_seconds: elapsed.as_secs_f64(),
            success: error.is_none(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_follows_error() {
        let ok = CallLogEntry::new(Utc::now(), "s", "t", Map::new(), Duration::from_millis(1500), None);
        assert!(ok.success);
        assert!((ok.latency_seconds - 1.5).abs() < f64::EPSILON);

        let failed = CallLogEntry::new(
            Utc::now(),
            "s",
            "t",
            Map::new(),
            Duration::ZERO,
            Some("timeout".to_string()),
        );
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_error_field_omitted_on_success() {
        let ok = CallLogEntry::new(Utc::now(), "s", "t", Map::new(), Duration::ZERO, None);
        let value = serde_json::to_value(&ok).unwrap();
        assert!(value.get("error").is_none());
    }
}
