//! Tool Registry & Dispatcher
//!
//! Provides:
//! - A fixed set of `(source, tool)` pairs, registered before the registry is shared
//! - Dispatch that never fails past its boundary: unknown tools, handler
//!   errors and handler panics all become failed [`ToolInvocationResult`]s
//! - Exactly one [`CallLogEntry`] per invocation attempt

use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::FutureExt;
use scout_core::{Error, ToolInvocationRequest, ToolInvocationResult};
use scout_execution_tracker::{CallLog, CallLogEntry};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::tool::BoxedTool;

/// Registry key: `(source, tool)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToolKey {
    pub source: String,
    pub tool: String,
}

impl ToolKey {
    pub fn new(source: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            tool: tool.into(),
        }
    }
}

/// Tool definition metadata (without the actual tool implementation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub source: String,
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A tool source (server) and its port placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub name: String,
    pub port: u16,
}

/// Tool Registry with call logging
pub struct ToolRegistry {
    tools: HashMap<ToolKey, BoxedTool>,
    sources: Vec<SourceInfo>,
    call_log: CallLog,
}

impl ToolRegistry {
    /// Create an empty registry with an unbounded call log
    pub fn new() -> Self {
        Self::with_call_log(CallLog::new())
    }

    /// Create an empty registry recording into `call_log`
    pub fn with_call_log(call_log: CallLog) -> Self {
        Self {
            tools: HashMap::new(),
            sources: Vec::new(),
            call_log,
        }
    }

    /// Record a tool source and its port (bookkeeping only)
    pub fn register_source(&mut self, name: impl Into<String>, port: u16) {
        let name = name.into();
        info!(source = %name, port, "Registered tool source");
        self.sources.retain(|s| s.name != name);
        self.sources.push(SourceInfo { name, port });
    }

    /// Register a tool; a later registration for the same pair replaces it
    pub fn register(&mut self, tool: BoxedTool) {
        let key = ToolKey::new(tool.source(), tool.name());
        if self.tools.insert(key.clone(), tool).is_some() {
            warn!(source = %key.source, tool = %key.tool, "Replaced existing tool");
        } else {
            debug!(source = %key.source, tool = %key.tool, "Registered tool");
        }
    }

    pub fn contains(&self, source: &str, tool: &str) -> bool {
        self.tools.contains_key(&ToolKey::new(source, tool))
    }

    /// Definitions of every registered tool, sorted by `(source, name)`
    pub fn list(&self) -> Vec<ToolDefinition> {
        let mut keys: Vec<&ToolKey> = self.tools.keys().collect();
        keys.sort();
        keys.into_iter()
            .filter_map(|key| self.tools.get(key))
            .map(|tool| ToolDefinition {
                source: tool.source().to_string(),
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn sources(&self) -> &[SourceInfo] {
        &self.sources
    }

    /// Handle onto the call log shared by every dispatch
    pub fn call_log(&self) -> &CallLog {
        &self.call_log
    }

    /// Run one request without logging it.
    ///
    /// Returns the result together with the log entry that records it; the
    /// caller is responsible for appending the entry.
    #[instrument(skip(self, request), fields(source = %request.source(), tool = %request.tool()))]
    pub async fn execute(
        &self,
        request: &ToolInvocationRequest,
    ) -> (ToolInvocationResult, CallLogEntry) {
        let started_at = Utc::now();
        let start = Instant::now();

        let outcome = match self.tools.get(&ToolKey::new(request.source(), request.tool())) {
            None => Err(Error::unknown_tool(request.source(), request.tool())),
            Some(tool) => AssertUnwindSafe(tool.execute(request.arguments()))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(Error::internal(format!(
                        "tool panicked: {}",
                        panic_message(panic.as_ref())
                    )))
                }),
        };

        let elapsed = start.elapsed();

        let result = match outcome {
            Ok(payload) => {
                debug!(elapsed_ms = elapsed.as_millis() as u64, "Tool call succeeded");
                ToolInvocationResult::succeeded(request.source(), request.tool(), payload)
            }
            Err(e) => {
                warn!(error = %e, elapsed_ms = elapsed.as_millis() as u64, "Tool call failed");
                ToolInvocationResult::failed(request.source(), request.tool(), e.to_string())
            }
        };

        let entry = CallLogEntry::new(
            started_at,
            request.source(),
            request.tool(),
            request.arguments().clone(),
            elapsed,
            result.error.clone(),
        );

        (result, entry)
    }

    /// Run one request and append its log entry
    pub async fn dispatch(&self, request: &ToolInvocationRequest) -> ToolInvocationResult {
        let in_flight = InFlight::new(&self.call_log, request);
        let (result, entry) = self.execute(request).await;
        self.call_log.append(entry).await;
        in_flight.complete();
        result
    }

    /// Run every request at once; results and log entries keep plan order
    pub async fn dispatch_concurrent(
        &self,
        requests: &[ToolInvocationRequest],
    ) -> Vec<ToolInvocationResult> {
        let in_flight: Vec<InFlight> = requests
            .iter()
            .map(|request| InFlight::new(&self.call_log, request))
            .collect();
        let outcomes = join_all(requests.iter().map(|request| self.execute(request))).await;

        let (results, entries): (Vec<_>, Vec<_>) = outcomes.into_iter().unzip();
        self.call_log.append_all(entries).await;
        in_flight.into_iter().for_each(InFlight::complete);
        results
    }

    /// Invoke `(source, tool)` with `arguments`
    pub async fn invoke(
        &self,
        source: &str,
        tool: &str,
        arguments: Map<String, Value>,
    ) -> ToolInvocationResult {
        self.dispatch(&ToolInvocationRequest::new(source, tool, arguments))
            .await
    }

    /// Log each source going away
    pub fn shutdown(&self) {
        for source in &self.sources {
            info!(source = %source.name, port = source.port, "Shutting down tool source");
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Error recorded for a call whose dispatch was dropped before it finished
pub const CANCELLED: &str = "cancelled";

/// Logs a cancelled attempt if dropped before [`InFlight::complete`]
struct InFlight {
    call_log: CallLog,
    started_at: DateTime<Utc>,
    start: Instant,
    request: Option<ToolInvocationRequest>,
}

impl InFlight {
    fn new(call_log: &CallLog, request: &ToolInvocationRequest) -> Self {
        Self {
            call_log: call_log.clone(),
            started_at: Utc::now(),
            start: Instant::now(),
            request: Some(request.clone()),
        }
    }

    fn complete(mut self) {
        self.request = None;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Some(request) = self.request.take() {
            warn!(source = %request.source(), tool = %request.tool(), "Tool call cancelled");
            self.call_log.append_detached(CallLogEntry::new(
                self.started_at,
                request.source(),
                request.tool(),
                request.arguments().clone(),
                self.start.elapsed(),
                Some(CANCELLED.to_string()),
            ));
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
