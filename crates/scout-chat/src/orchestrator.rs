//! Conversation Orchestrator
//!
//! One turn runs `Idle → Planning → Dispatching → Formatting → Generating → Idle`.
//! Chunks are yielded as they are produced. The user turn and the assistant
//! reply are committed to history together, and only when the stream runs to
//! completion: a backend error or a dropped stream leaves history untouched.

use async_stream::stream;
use futures::Stream;
use scout_core::{DispatchMode, ToolInvocationRequest, ToolInvocationResult, Turn};
use scout_execution_tracker::CallLogEntry;
use scout_llm::{BoxedBackend, GenerationRequest};
use scout_tools::ToolRegistry;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::formatter::results_turn;
use crate::planner::ToolPlanner;
use crate::system_prompt::build_system_prompt;

/// Where the current turn is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Planning,
    Dispatching,
    Formatting,
    Generating,
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnPhase::Idle => "idle",
            TurnPhase::Planning => "planning",
            TurnPhase::Dispatching => "dispatching",
            TurnPhase::Formatting => "formatting",
            TurnPhase::Generating => "generating",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub dispatch: DispatchMode,
    /// Emit progress lines (tool calls, outcomes) into the turn stream
    pub show_trace: bool,
    pub max_output_tokens: Option<u32>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchMode::Sequential,
            show_trace: true,
            max_output_tokens: None,
        }
    }
}

pub const ANALYZING_TRACE: &str = "\n📝 Analyzing results and generating response...\n\n";
pub const GENERATING_TRACE: &str = "\n📝 Generating response...\n\n";

fn calling_trace(request: &ToolInvocationRequest) -> String {
    format!(
        "\n🔧 Calling {} with {}\n",
        request.qualified_name(),
        Value::Object(request.arguments().clone())
    )
}

fn outcome_trace(result: &ToolInvocationResult) -> String {
    if result.success {
        "✅ Tool call completed successfully\n".to_string()
    } else {
        format!(
            "❌ Tool call failed: {}\n",
            result.error.as_deref().unwrap_or("Unknown error")
        )
    }
}

/// Puts the phase back to `Idle` however the turn ends
struct IdleOnDrop(Arc<watch::Sender<TurnPhase>>);

impl Drop for IdleOnDrop {
    fn drop(&mut self) {
        self.0.send_replace(TurnPhase::Idle);
    }
}

pub struct ConversationOrchestrator {
    history: Vec<Turn>,
    planner: Box<dyn ToolPlanner>,
    registry: Arc<ToolRegistry>,
    backend: BoxedBackend,
    system_prompt: String,
    config: OrchestratorConfig,
    phase: Arc<watch::Sender<TurnPhase>>,
}

impl ConversationOrchestrator {
    pub fn new(
        planner: Box<dyn ToolPlanner>,
        registry: Arc<ToolRegistry>,
        backend: BoxedBackend,
        config: OrchestratorConfig,
    ) -> Self {
        let system_prompt = build_system_prompt(&registry);
        let (phase, _) = watch::channel(TurnPhase::Idle);
        info!(
            provider = %backend.provider_type(),
            model = %backend.model(),
            tools = registry.len(),
            dispatch = ?config.dispatch,
            "Conversation orchestrator ready"
        );
        Self {
            history: Vec::new(),
            planner,
            registry,
            backend,
            system_prompt,
            config,
            phase: Arc::new(phase),
        }
    }

    /// Committed conversation, oldest first
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn phase(&self) -> TurnPhase {
        *self.phase.borrow()
    }

    /// Follow phase changes while a turn holds the orchestrator
    pub fn subscribe_phase(&self) -> watch::Receiver<TurnPhase> {
        self.phase.subscribe()
    }

    /// Snapshot of every tool call made so far
    pub async fn get_call_log(&self) -> Vec<CallLogEntry> {
        self.registry.call_log().snapshot().await
    }

    fn set_phase(&self, phase: TurnPhase) {
        debug!(%phase, "Turn phase");
        self.phase.send_replace(phase);
    }

    /// Process one user message, yielding response chunks as they arrive.
    ///
    /// Dropping the stream before it finishes cancels the turn.
    pub fn process_turn<'a>(&'a mut self, user_text: &str) -> impl Stream<Item = String> + 'a {
        let user_turn = Turn::user(user_text);

        stream! {
            let _idle = IdleOnDrop(self.phase.clone());
            let trace = self.config.show_trace;

            let mut transcript = self.history.clone();
            transcript.push(user_turn.clone());

            self.set_phase(TurnPhase::Planning);
            let plan = self.planner.plan(&transcript);
            info!(requests = plan.len(), "Turn planned");

            let mut context: Option<Turn> = None;
            if plan.is_empty() {
                if trace {
                    yield GENERATING_TRACE.to_string();
                }
            } else {
                self.set_phase(TurnPhase::Dispatching);
                let results = match self.config.dispatch {
                    DispatchMode::Sequential => {
                        let mut results = Vec::with_capacity(plan.len());
                        for request in &plan {
                            if trace {
                                yield calling_trace(request);
                            }
                            let result = self.registry.dispatch(request).await;
                            if trace {
                                yield outcome_trace(&result);
                            }
                            results.push(result);
                        }
                        results
                    }
                    DispatchMode::Concurrent => {
                        if trace {
                            for request in &plan {
                                yield calling_trace(request);
                            }
                        }
                        let results = self.registry.dispatch_concurrent(&plan).await;
                        if trace {
                            for result in &results {
                                yield outcome_trace(result);
                            }
                        }
                        results
                    }
                };

                self.set_phase(TurnPhase::Formatting);
                let turn = results_turn(&results);
                debug!(chars = turn.content.len(), "Formatted tool results");
                context = Some(turn);

                if trace {
                    yield ANALYZING_TRACE.to_string();
                }
            }

            self.set_phase(TurnPhase::Generating);
            let mut messages = transcript;
            messages.extend(context);
            let mut request = GenerationRequest::new(messages).with_system(self.system_prompt.clone());
            request.max_output_tokens = self.config.max_output_tokens;

            let mut chunks = match self.backend.stream_generate(request).await {
                Ok(chunks) => chunks,
                Err(e) => {
                    error!("Generation failed to start: {}", e);
                    yield format!("Error: {}", e);
                    return;
                }
            };

            let mut reply = String::new();
            while let Some(chunk) = chunks.recv().await {
                match chunk {
                    Ok(text) => {
                        reply.push_str(&text);
                        yield text;
                    }
                    Err(e) => {
                        error!("Generation failed mid-stream: {}", e);
                        yield format!("Error: {}", e);
                        return;
                    }
                }
            }

            debug!(chars = reply.len(), "Turn complete");
            self.history.push(user_turn);
            self.history.push(Turn::assistant(reply));
        }
    }
}
