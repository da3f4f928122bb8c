//! `paper_search.search_papers`

use async_trait::async_trait;
use scout_core::Result;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::args::{required_str, BoundsPolicy, IntegerBounds};
use crate::backends::BoxedSearchBackend;
use crate::Tool;

pub const SOURCE: &str = "paper_search";
pub const NAME: &str = "search_papers";

pub const MAX_RESULTS: IntegerBounds = IntegerBounds {
    key: "max_results",
    description: "Maximum number of results to return",
    default: 10,
    min: 1,
    max: 50,
    policy: BoundsPolicy::Clamp,
};

pub struct SearchPapersTool {
    backend: BoxedSearchBackend,
}

impl SearchPapersTool {
    pub fn new(backend: BoxedSearchBackend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for SearchPapersTool {
    fn source(&self) -> &str {
        SOURCE
    }

    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Search for academic papers on ArXiv"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query for papers"
                },
                "max_results": MAX_RESULTS.schema_property()
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<Value> {
        let query = required_str(arguments, "query")?;
        let max_results = MAX_RESULTS.resolve(arguments)? as usize;

        info!("Searching papers: query='{}', max_results={}", query, max_results);
        let results = self.backend.search(query, max_results).await?;

        Ok(json!({
            "success": true,
            "count": results.len(),
            "results": results,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{Paper, SearchBackend};
    use chrono::Utc;
    use scout_core::Error;
    use std::sync::{Arc, Mutex};

    /// Records the requested count and returns that many papers
    #[derive(Default)]
    struct RecordingSearch {
        requested: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl SearchBackend for RecordingSearch {
        async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>> {
            self.requested
                .lock()
                .unwrap()
                .push((query.to_string(), max_results));
            Ok((0..max_results.min(3))
                .map(|i| Paper {
                    id: format!("id-{}", i),
                    title: format!("Paper {}", i),
                    authors: vec!["A. Author".to_string()],
                    summary: "Abstract".to_string(),
                    published: Utc::now(),
                    updated: None,
                    categories: vec![],
                    source_url: format!("http://arxiv.org/pdf/{}", i),
                    links: vec![],
                })
                .collect())
        }
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_payload_shape() {
        let backend = Arc::new(RecordingSearch::default());
        let tool = SearchPapersTool::new(backend.clone());

        let payload = tool
            .execute(&args(json!({"query": "quantum computing", "max_results": 5})))
            .await
            .unwrap();

        assert_eq!(payload["success"], true);
        assert_eq!(payload["count"], 3);
        assert_eq!(payload["results"][0]["title"], "Paper 0");
        assert_eq!(
            backend.requested.lock().unwrap().as_slice(),
            &[("quantum computing".to_string(), 5)]
        );
    }

    #[tokio::test]
    async fn test_max_results_clamped() {
        let backend = Arc::new(RecordingSearch::default());
        let tool = SearchPapersTool::new(backend.clone());

        tool.execute(&args(json!({"query": "q", "max_results": 500})))
            .await
            .unwrap();
        tool.execute(&args(json!({"query": "q"}))).await.unwrap();

        let counts: Vec<usize> = backend.requested.lock().unwrap().iter().map(|r| r.1).collect();
        assert_eq!(counts, vec![50, 10]);
    }

    #[tokio::test]
    async fn test_blank_query_rejected() {
        let tool = SearchPapersTool::new(Arc::new(RecordingSearch::default()));
        let err = tool.execute(&args(json!({"query": "  "}))).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArguments(_)));
    }
}
