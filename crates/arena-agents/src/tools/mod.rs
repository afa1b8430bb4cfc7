//! Rig-compatible tools for the competition roles.
//!
//! Each tool implements `rig::tool::Tool` and is attached to agents via
//! `AgentBuilder::tool()`. Sandbox and model failures are returned as report
//! strings so the model can react to them; `ToolError` is reserved for
//! arguments the tool cannot act on.

pub mod exec_tool;
pub mod problem_tool;
pub mod test_suite_tool;

pub use exec_tool::ExecuteCodeTool;
pub use problem_tool::FetchProblemTool;
pub use test_suite_tool::RunTestSuiteTool;

/// Errors that can occur during tool execution.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
}
