//! Turn executor: wraps one agent with timing, metrics and failure isolation.
//!
//! A turn either succeeds completely or ends the run. There are no retries
//! here. Failures of any kind (an `Err` from the agent, a broken invariant in
//! the returned state, or a panic) are appended to the error ledger and the
//! status is forced to `error`. This is the only code path that sets that
//! status.

use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentError, TurnOutput};
use crate::invariants::verify_turn;
use crate::roles::Role;
use crate::state::{CompetitionState, CompetitionStatus};

/// Per-agent counters. Owned by the executor wrapping that agent.
#[derive(Debug, Clone, Default)]
pub struct AgentMetrics {
    calls: u64,
    errors: u64,
    total_time: Duration,
    tool_calls: u64,
}

impl AgentMetrics {
    pub fn success_rate(&self) -> f64 {
        (self.calls - self.errors) as f64 / self.calls.max(1) as f64
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            calls: self.calls,
            errors: self.errors,
            success_rate: self.success_rate(),
            average_execution_time: self.total_time.as_secs_f64() / self.calls.max(1) as f64,
            tool_calls: self.tool_calls,
        }
    }
}

/// Read-only view of an agent's counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub calls: u64,
    pub errors: u64,
    pub success_rate: f64,
    /// Mean seconds per call.
    pub average_execution_time: f64,
    pub tool_calls: u64,
}

/// Result of one executed turn.
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// Successor state. On failure this is the input state with the error
    /// recorded and status `error`.
    pub state: CompetitionState,
    pub succeeded: bool,
    pub elapsed: Duration,
}

/// One agent plus its metrics.
pub struct TurnExecutor {
    agent: Box<dyn Agent>,
    metrics: AgentMetrics,
}

impl TurnExecutor {
    pub fn new(agent: Box<dyn Agent>) -> Self {
        Self {
            agent,
            metrics: AgentMetrics::default(),
        }
    }

    pub fn role(&self) -> Role {
        self.agent.role()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Run one turn. Consumes the state and returns its successor.
    pub async fn execute(&mut self, state: CompetitionState) -> TurnResult {
        let role = self.agent.role();
        let round = state.current_round;
        let start = Instant::now();
        self.metrics.calls += 1;

        tracing::info!(role = %role, round, "Turn started");

        let outcome = AssertUnwindSafe(self.agent.act(&state))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(AgentError::Panicked(panic_message(payload.as_ref()))))
            .and_then(|output| match verify_turn(&state, &output.state) {
                Ok(()) => Ok(output),
                Err(violation) => Err(AgentError::from(violation).with_usage(output.usage())),
            });

        let elapsed = start.elapsed();
        match outcome {
            Ok(TurnOutput {
                state: mut next,
                model_calls,
                tool_calls,
                tokens,
            }) => {
                self.metrics.total_time += elapsed;
                self.metrics.tool_calls += tool_calls;
                next.metrics.record_usage(model_calls, tokens);
                tracing::info!(
                    role = %role,
                    round,
                    elapsed_ms = elapsed.as_millis() as u64,
                    tool_calls,
                    status = %next.status,
                    "Turn finished"
                );
                TurnResult {
                    state: next,
                    succeeded: true,
                    elapsed,
                }
            }
            Err(e) => {
                let spent = e.usage();
                self.metrics.errors += 1;
                self.metrics.tool_calls += spent.tool_calls;
                tracing::error!(
                    role = %role,
                    round,
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    model_calls = spent.model_calls,
                    success_rate = self.metrics.success_rate(),
                    "Turn failed"
                );
                let mut failed = state;
                failed.metrics.record_usage(spent.model_calls, spent.tokens);
                failed.record_error(format!("{} Error: {e}", role.label()));
                failed.status = CompetitionStatus::Error;
                TurnResult {
                    state: failed,
                    succeeded: false,
                    elapsed,
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Usage;
    use async_trait::async_trait;

    struct Noting;

    #[async_trait]
    impl Agent for Noting {
        fn role(&self) -> Role {
            Role::RoundController
        }
        async fn act(&self, state: &CompetitionState) -> Result<TurnOutput, AgentError> {
            let mut next = state.clone();
            next.note(Role::RoundController, "thinking");
            Ok(TurnOutput {
                state: next,
                model_calls: 1,
                tool_calls: 2,
                tokens: 40,
            })
        }
    }

    struct Failing;

    #[async_trait]
    impl Agent for Failing {
        fn role(&self) -> Role {
            Role::SolverA
        }
        async fn act(&self, _state: &CompetitionState) -> Result<TurnOutput, AgentError> {
            Err(AgentError::validation("missing field `code`"))
        }
    }

    struct SpentThenFailing;

    #[async_trait]
    impl Agent for SpentThenFailing {
        fn role(&self) -> Role {
            Role::SolverB
        }
        async fn act(&self, _state: &CompetitionState) -> Result<TurnOutput, AgentError> {
            let usage = Usage {
                model_calls: 2,
                tool_calls: 3,
                tokens: 90,
            };
            let exhausted = AgentError::validation("coderB used all 2 attempt(s) for round 1");
            Err(exhausted.with_usage(usage))
        }
    }

    struct Panicking;

    #[async_trait]
    impl Agent for Panicking {
        fn role(&self) -> Role {
            Role::Reviewer
        }
        async fn act(&self, _state: &CompetitionState) -> Result<TurnOutput, AgentError> {
            panic!("reviewer exploded");
        }
    }

    struct Eraser;

    #[async_trait]
    impl Agent for Eraser {
        fn role(&self) -> Role {
            Role::SolverB
        }
        async fn act(&self, state: &CompetitionState) -> Result<TurnOutput, AgentError> {
            let mut next = state.clone();
            next.error_log.clear();
            Ok(TurnOutput::new(next))
        }
    }

    #[tokio::test]
    async fn test_success_updates_metrics_and_usage() {
        let mut exec = TurnExecutor::new(Box::new(Noting));
        let result = exec.execute(CompetitionState::new(1)).await;
        assert!(result.succeeded);
        assert_eq!(result.state.metrics.api_calls_made, 1);
        assert_eq!(result.state.metrics.total_tokens, 40);
        assert!(result.state.conversation_context.contains("Moderator: thinking"));

        let m = exec.metrics();
        assert_eq!(m.calls, 1);
        assert_eq!(m.errors, 0);
        assert_eq!(m.success_rate, 1.0);
        assert_eq!(m.tool_calls, 2);
    }

    #[tokio::test]
    async fn test_failure_records_error_and_sets_status() {
        let mut exec = TurnExecutor::new(Box::new(Failing));
        let result = exec.execute(CompetitionState::new(1)).await;
        assert!(!result.succeeded);
        assert_eq!(result.state.status, CompetitionStatus::Error);
        assert_eq!(result.state.error_log.len(), 1);
        assert_eq!(
            result.state.error_log[0],
            "CoderA Error: output validation failed: missing field `code`"
        );

        let m = exec.metrics();
        assert_eq!(m.calls, 1);
        assert_eq!(m.errors, 1);
        assert_eq!(m.success_rate, 0.0);
    }

    #[tokio::test]
    async fn test_failed_turn_keeps_spent_usage() {
        let mut exec = TurnExecutor::new(Box::new(SpentThenFailing));
        let result = exec.execute(CompetitionState::new(1)).await;
        assert!(!result.succeeded);
        assert_eq!(result.state.metrics.api_calls_made, 2);
        assert_eq!(result.state.metrics.total_tokens, 90);
        assert_eq!(
            result.state.error_log[0],
            "CoderB Error: output validation failed: coderB used all 2 attempt(s) for round 1"
        );

        let m = exec.metrics();
        assert_eq!(m.errors, 1);
        assert_eq!(m.tool_calls, 3);
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let mut exec = TurnExecutor::new(Box::new(Panicking));
        let result = exec.execute(CompetitionState::new(1)).await;
        assert!(!result.succeeded);
        assert_eq!(result.state.status, CompetitionStatus::Error);
        assert!(result.state.error_log[0].starts_with("Reviewer Error: agent panicked"));
        assert!(result.state.error_log[0].contains("reviewer exploded"));
    }

    #[tokio::test]
    async fn test_invariant_violation_is_turn_failure() {
        let mut state = CompetitionState::new(1);
        state.record_error("earlier");
        let mut exec = TurnExecutor::new(Box::new(Eraser));
        let result = exec.execute(state).await;
        assert!(!result.succeeded);
        // Input state is kept, so the earlier entry survives.
        assert_eq!(result.state.error_log.len(), 2);
        assert_eq!(result.state.error_log[0], "earlier");
        assert!(result.state.error_log[1].contains("invariant violated"));
    }

    #[test]
    fn test_empty_metrics_snapshot() {
        let m = AgentMetrics::default().snapshot();
        assert_eq!(m.calls, 0);
        assert_eq!(m.success_rate, 0.0);
        assert_eq!(m.average_execution_time, 0.0);
    }
}
