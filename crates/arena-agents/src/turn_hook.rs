//! Rig PromptHook that accounts tool use for one model call.
//!
//! Counts completion turns and tool invocations, classifies tool results that
//! report failure, and cuts the tool loop off once the per-call tool budget or
//! the role's wall-clock deadline is spent. Tool failures are never raised:
//! they reach the model as result strings and are only counted here.
//!
//! ```ignore
//! let hook = TurnHook::new(HookConfig::for_role(Role::Reviewer, 12, review_time));
//! let text = agent.prompt(&task).with_hook(hook.clone()).await?;
//! let report = hook.report()?;
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use competition::Role;
use rig::agent::{HookAction, PromptHook, ToolCallHookAction};
use rig::completion::CompletionModel;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Result prefixes produced by the sandbox tools and by rig on tool failure.
const ERROR_MARKERS: &[&str] = &[
    "EXECUTION ERROR",
    "SANDBOX ERROR",
    "TEST SUITE ERROR",
    "Toolset error",
    "ToolCallError",
    "Error",
    "error",
];

/// Budget for one hooked model call.
#[derive(Debug, Clone)]
pub struct HookConfig {
    pub role: Role,
    /// Tool calls allowed before the loop is terminated.
    pub max_tool_calls: Option<usize>,
    /// Wall-clock deadline for the whole call.
    pub deadline: Option<Instant>,
    /// Characters kept in argument previews.
    pub preview_len: usize,
}

impl HookConfig {
    pub fn for_role(role: Role, max_tool_calls: usize, allowance: Duration) -> Self {
        Self {
            role,
            max_tool_calls: Some(max_tool_calls),
            deadline: Some(Instant::now() + allowance),
            preview_len: 160,
        }
    }
}

/// Counters extracted after the call completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookReport {
    pub completion_turns: u64,
    pub tool_calls: u64,
    pub tool_errors: u64,
    pub tool_time_ms: u64,
    pub terminated_early: bool,
    pub termination_reason: Option<String>,
}

#[derive(Default)]
struct HookState {
    report: HookReport,
    in_flight: HashMap<String, Instant>,
}

/// Clone-able hook; clones share counters.
#[derive(Clone)]
pub struct TurnHook {
    state: Arc<Mutex<HookState>>,
    config: Arc<HookConfig>,
}

/// Whether a tool result string reports a failure.
pub fn is_error_result(result: &str) -> bool {
    let trimmed = result.trim_start();
    ERROR_MARKERS.iter().any(|m| trimmed.starts_with(m))
}

fn preview(s: &str, max_len: usize) -> String {
    match s.char_indices().nth(max_len) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

impl TurnHook {
    pub fn new(config: HookConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(HookState::default())),
            config: Arc::new(config),
        }
    }

    pub fn report(&self) -> Result<HookReport, String> {
        self.state
            .lock()
            .map(|s| s.report.clone())
            .map_err(|e| format!("TurnHook mutex poisoned: {e}"))
    }
}

impl<M: CompletionModel> PromptHook<M> for TurnHook {
    fn on_completion_call(
        &self,
        _prompt: &rig::completion::message::Message,
        _history: &[rig::completion::message::Message],
    ) -> impl std::future::Future<Output = HookAction> + Send {
        let state = self.state.clone();
        let role = self.config.role;
        async move {
            match state.lock() {
                Ok(mut s) => {
                    s.report.completion_turns += 1;
                    debug!(role = %role, turn = s.report.completion_turns, "Model turn started");
                }
                Err(e) => warn!(
                    role = %role,
                    error = %e,
                    "Hook state poisoned in on_completion_call"
                ),
            }
            HookAction::cont()
        }
    }

    fn on_tool_call(
        &self,
        tool_name: &str,
        _tool_call_id: Option<String>,
        internal_call_id: &str,
        args: &str,
    ) -> impl std::future::Future<Output = ToolCallHookAction> + Send {
        let state = self.state.clone();
        let config = self.config.clone();
        let tool_name = tool_name.to_string();
        let internal_call_id = internal_call_id.to_string();
        let args_preview = preview(args, config.preview_len);

        async move {
            let mut s = match state.lock() {
                Ok(guard) => guard,
                Err(e) => {
                    warn!(
                        role = %config.role,
                        tool = %tool_name,
                        error = %e,
                        "Hook state poisoned in on_tool_call"
                    );
                    return ToolCallHookAction::terminate("turn hook: internal state corrupted");
                }
            };

            if let Some(deadline) = config.deadline {
                if Instant::now() >= deadline {
                    s.report.terminated_early = true;
                    s.report.termination_reason = Some("deadline exceeded".to_string());
                    warn!(
                        role = %config.role,
                        tool = %tool_name,
                        "Tool call rejected: deadline exceeded"
                    );
                    return ToolCallHookAction::terminate("turn hook: deadline exceeded");
                }
            }

            if let Some(max) = config.max_tool_calls {
                if s.report.tool_calls >= max as u64 {
                    let reason = format!("max tool calls ({max}) exceeded");
                    s.report.terminated_early = true;
                    s.report.termination_reason = Some(reason.clone());
                    warn!(
                        role = %config.role,
                        tool = %tool_name,
                        max_tool_calls = max,
                        "Tool call rejected: budget exceeded"
                    );
                    return ToolCallHookAction::terminate(format!("turn hook: {reason}"));
                }
            }

            s.report.tool_calls += 1;
            s.in_flight.insert(internal_call_id.clone(), Instant::now());
            debug!(
                role = %config.role,
                tool = %tool_name,
                call_id = %internal_call_id,
                args = %args_preview,
                "Tool call started"
            );
            ToolCallHookAction::cont()
        }
    }

    fn on_tool_result(
        &self,
        tool_name: &str,
        _tool_call_id: Option<String>,
        internal_call_id: &str,
        _args: &str,
        result: &str,
    ) -> impl std::future::Future<Output = HookAction> + Send {
        let state = self.state.clone();
        let role = self.config.role;
        let tool_name = tool_name.to_string();
        let internal_call_id = internal_call_id.to_string();
        let failed = is_error_result(result);
        let result_len = result.len();

        async move {
            let mut s = match state.lock() {
                Ok(guard) => guard,
                Err(e) => {
                    warn!(
                        role = %role,
                        tool = %tool_name,
                        error = %e,
                        "Hook state poisoned in on_tool_result"
                    );
                    return HookAction::cont();
                }
            };

            let duration = s
                .in_flight
                .remove(&internal_call_id)
                .map(|started| started.elapsed())
                .unwrap_or(Duration::ZERO);
            s.report.tool_time_ms += duration.as_millis() as u64;
            if failed {
                s.report.tool_errors += 1;
            }

            info!(
                role = %role,
                tool = %tool_name,
                duration_ms = duration.as_millis() as u64,
                failed,
                result_len,
                "Tool call completed"
            );
            HookAction::cont()
        }
    }
}
