//! Model-call seam between the role agents and the inference endpoint.
//!
//! Role agents depend on [`ModelCall`] only, so tests drive them with
//! scripted replies while the binary plugs in [`RigModel`].

use std::time::Duration;

use async_trait::async_trait;
use competition::{AgentError, Role, Usage};
use rig::agent::Agent;
use rig::completion::Prompt;
use rig::providers::openai;
use tracing::{debug, warn};

use crate::turn_hook::{HookConfig, TurnHook};

/// Type alias for agents built from OpenAI-compatible endpoints.
pub type OaiAgent = Agent<openai::completion::CompletionModel>;

/// Text returned by one model call plus what it cost.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    pub text: String,
    pub usage: Usage,
}

impl ModelReply {
    pub fn new(text: impl Into<String>, usage: Usage) -> Self {
        Self {
            text: text.into(),
            usage,
        }
    }
}

#[async_trait]
pub trait ModelCall: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<ModelReply, AgentError>;
}

/// Rough token estimate for usage accounting (~4 chars per token, +10%).
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as f64 * 1.1 / 4.0).ceil() as u64
}

/// Whether a provider error is worth retrying.
///
/// HTTP 429/502/503 and connection-level failures are transient; anything
/// else (bad request, auth, tool loop exhaustion) is returned immediately.
pub fn is_transient_error(err_str: &str) -> bool {
    let err_lower = err_str.to_ascii_lowercase();
    err_str.contains("502")
        || err_str.contains("503")
        || err_str.contains("429")
        || err_lower.contains("connection")
        || err_lower.contains("timed out")
        || err_lower.contains("timeout")
        || err_lower.contains("error sending request")
        || err_lower.contains("broken pipe")
        || err_lower.contains("reset by peer")
        || err_lower.contains("response contained no message or tool call")
}

/// Exponential backoff before retry `attempt` (0-based): 2s, 4s, 8s, ...
pub fn backoff_for(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt + 1))
}

/// A rig agent behind a per-call [`TurnHook`] and transient-error retry.
pub struct RigModel {
    agent: OaiAgent,
    role: Role,
    max_retries: u32,
    max_tool_calls: usize,
    allowance: Duration,
}

impl RigModel {
    pub fn new(
        agent: OaiAgent,
        role: Role,
        max_retries: u32,
        max_tool_calls: usize,
        allowance: Duration,
    ) -> Self {
        Self {
            agent,
            role,
            max_retries,
            max_tool_calls,
            allowance,
        }
    }
}

#[async_trait]
impl ModelCall for RigModel {
    async fn complete(&self, prompt: &str) -> Result<ModelReply, AgentError> {
        let mut attempt = 0;
        loop {
            let hook = TurnHook::new(HookConfig::for_role(
                self.role,
                self.max_tool_calls,
                self.allowance,
            ));
            match self.agent.prompt(prompt).with_hook(hook.clone()).await {
                Ok(text) => {
                    let report = hook.report().map_err(AgentError::Model)?;
                    let usage = Usage {
                        model_calls: report.completion_turns.max(1),
                        tool_calls: report.tool_calls,
                        tokens: estimate_tokens(prompt) + estimate_tokens(&text),
                    };
                    debug!(
                        role = %self.role,
                        model_calls = usage.model_calls,
                        tool_calls = usage.tool_calls,
                        tool_errors = report.tool_errors,
                        terminated_early = report.terminated_early,
                        "Model call finished"
                    );
                    return Ok(ModelReply { text, usage });
                }
                Err(e) => {
                    let err_str = e.to_string();
                    if !is_transient_error(&err_str) || attempt >= self.max_retries {
                        return Err(AgentError::Model(err_str));
                    }
                    let backoff = backoff_for(attempt);
                    warn!(
                        role = %self.role,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        backoff_secs = backoff.as_secs(),
                        error = %err_str,
                        "Transient model error, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}
