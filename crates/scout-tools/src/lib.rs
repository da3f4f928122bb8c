//! scout-tools: Tool Registry and Execution
//!
//! Provides the tool registry/dispatcher, the built-in research tools and
//! the search/document backends they call.

pub mod args;
pub mod backends;
pub mod builtin;
pub mod registry;
pub mod tool;

// Re-export main types
pub use builtin::{register_builtin_tools, BuiltinBackends};
pub use registry::{SourceInfo, ToolDefinition, ToolKey, ToolRegistry};
pub use tool::{BoxedTool, SimpleTool, Tool};
