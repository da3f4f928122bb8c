//! Core Tool trait and types
//!
//! A tool is identified by its `(source, name)` pair. `source` names the
//! server a tool belongs to (`paper_search`, `pdf_summarize`, ...).

use async_trait::async_trait;
use scout_core::Result;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Core trait for all tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Source (server) this tool belongs to
    fn source(&self) -> &str;

    /// Tool name, unique within its source
    fn name(&self) -> &str;

    /// Get human-readable description
    fn description(&self) -> &str;

    /// Get JSON schema for input validation
    fn input_schema(&self) -> Value;

    /// Execute the tool with given arguments.
    ///
    /// Argument contracts (required keys, numeric bounds) are enforced here.
    async fn execute(&self, arguments: &Map<String, Value>) -> Result<Value>;
}

/// Type alias for shared tools
pub type BoxedTool = Arc<dyn Tool>;

type Handler = dyn Fn(&Map<String, Value>) -> Result<Value> + Send + Sync;

/// Closure-backed tool, handy for tests and small adapters
#[derive(Clone)]
pub struct SimpleTool {
    source: String,
    name: String,
    description: String,
    schema: Value,
    handler: Arc<Handler>,
}

impl SimpleTool {
    pub fn new<F>(source: &str, name: &str, description: &str, schema: Value, handler: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            source: source.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            schema,
            handler: Arc::new(handler),
        }
    }
}

#[async_trait]
impl Tool for SimpleTool {
    fn source(&self) -> &str {
        &self.source
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<Value> {
        (self.handler)(arguments)
    }
}
