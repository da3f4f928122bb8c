//! scout-chat: Conversation Orchestration
//!
//! - `planner`: history → ordered tool invocations
//! - `formatter`: tool results → context text
//! - `system_prompt`: fixed instruction listing the registered tools
//! - `orchestrator`: the per-turn state machine and chunk stream

pub mod formatter;
pub mod orchestrator;
pub mod planner;
pub mod system_prompt;

pub use formatter::{format_results, results_turn};
pub use orchestrator::{ConversationOrchestrator, OrchestratorConfig, TurnPhase};
pub use planner::{KeywordPlanner, PlannerConfig, ToolPlanner};
pub use system_prompt::build_system_prompt;
