//! Scout Execution Tracker - Call Log for Tool Invocations
//!
//! Every tool invocation attempt, successful or not, leaves exactly one
//! [`CallLogEntry`]. Readers only ever see snapshots (copies), never the
//! live buffer.

pub mod call_log;
pub mod entry;

pub use call_log::{CallLog, CallLogStats};
pub use entry::CallLogEntry;
