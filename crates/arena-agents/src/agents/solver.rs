//! Solver agents: one implementation, two seats.
//!
//! A solver turn re-prompts after a reply that fails to parse or validate,
//! within the problem's attempt budget. Every attempt is counted in the
//! state's attempt ledger; only a valid submission is appended.

use std::sync::Arc;

use async_trait::async_trait;
use competition::artifacts::BUDGET_MAX_ATTEMPTS;
use competition::{
    Agent, AgentError, CompetitionState, ModelSettings, Problem, Role, Solver, Submission,
    TurnOutput, Usage,
};
use rig::client::CompletionClient;
use rig::providers::openai;
use tracing::{info, warn};

use super::output::parse_artifact;
use crate::model::{ModelCall, OaiAgent};
use crate::prompts;
use crate::sandbox::Sandbox;
use crate::tools::{ExecuteCodeTool, RunTestSuiteTool};

pub const DEFAULT_MAX_ATTEMPTS: u64 = 2;
pub const MAX_ATTEMPTS_CEILING: u64 = 5;

/// Attempt budget for a problem, clamped to `1..=MAX_ATTEMPTS_CEILING`.
pub fn attempt_budget(problem: &Problem) -> u32 {
    problem
        .budget(BUDGET_MAX_ATTEMPTS)
        .unwrap_or(DEFAULT_MAX_ATTEMPTS)
        .clamp(1, MAX_ATTEMPTS_CEILING) as u32
}

/// Build a solver model. The persona is supplied per task from the state.
///
/// Tools: execute_code_sandbox, run_test_suite.
pub fn build_solver(
    client: &openai::CompletionsClient,
    settings: &ModelSettings,
    solver: Solver,
    sandbox: Arc<Sandbox>,
    max_turns: usize,
) -> OaiAgent {
    client
        .agent(&settings.model_name)
        .name(solver.role().token())
        .description("Competing Python developer. Returns one JSON submission.")
        .preamble(prompts::SOLVER_BASE_PREAMBLE)
        .temperature(settings.temperature)
        .max_tokens(settings.max_tokens)
        .tool(ExecuteCodeTool::new(sandbox.clone()))
        .tool(RunTestSuiteTool::new(sandbox))
        .default_max_turns(max_turns)
        .build()
}

/// Parse and check a submission reply against the problem it answers.
pub fn parse_submission(text: &str, problem: &Problem) -> Result<Submission, AgentError> {
    let submission: Submission = parse_artifact(text, "submission")?;
    submission.validate().map_err(AgentError::validation)?;
    let entrypoint = submission.entrypoint.trim();
    if !entrypoint.is_empty() && entrypoint != problem.entrypoint {
        return Err(AgentError::validation(format!(
            "submission entrypoint `{entrypoint}` does not match problem entrypoint `{}`",
            problem.entrypoint
        )));
    }
    Ok(submission)
}

pub struct SolverAgent {
    solver: Solver,
    model: Arc<dyn ModelCall>,
}

impl SolverAgent {
    pub fn new(solver: Solver, model: Arc<dyn ModelCall>) -> Self {
        Self { solver, model }
    }
}

#[async_trait]
impl Agent for SolverAgent {
    fn role(&self) -> Role {
        self.solver.role()
    }

    async fn act(&self, state: &CompetitionState) -> Result<TurnOutput, AgentError> {
        let solver = self.solver;
        let round = state.current_round;
        let problem = state.current_problem.as_ref().ok_or_else(|| {
            AgentError::MissingInput(format!("no current problem for round {round}"))
        })?;
        let max_attempts = attempt_budget(problem);

        let mut next = state.clone();
        if next.attempts.round != round {
            next.attempts.reset(round);
        }
        let mut usage = Usage::default();
        let mut retry_error: Option<String> = None;

        let submission = loop {
            let attempt = next.attempts.count(solver) + 1;
            if attempt > max_attempts {
                let last = retry_error.unwrap_or_else(|| "no attempt made".into());
                let exhausted = AgentError::validation(format!(
                    "{solver} used all {max_attempts} attempt(s) for round {round}: {last}"
                ));
                return Err(exhausted.with_usage(usage));
            }
            next.attempts.record(solver);

            let task = prompts::solver_task(
                &next,
                solver,
                attempt,
                max_attempts,
                retry_error.as_deref(),
            );
            let reply = match self.model.complete(&task).await {
                Ok(reply) => reply,
                Err(e) => return Err(e.with_usage(usage)),
            };
            usage.add(reply.usage);

            match parse_submission(&reply.text, problem) {
                Ok(submission) => break submission,
                Err(e) if e.is_retriable_in_turn() => {
                    warn!(
                        role = %solver,
                        round,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Submission rejected"
                    );
                    retry_error = Some(e.to_string());
                }
                Err(e) => return Err(e.with_usage(usage)),
            }
        };

        let entrypoint = if submission.entrypoint.trim().is_empty() {
            problem.entrypoint.clone()
        } else {
            submission.entrypoint.clone()
        };
        let attempts = next.attempts.count(solver);
        next.record_submission(solver, submission)
            .map_err(|e| AgentError::from(e).with_usage(usage))?;
        next.note(
            solver.role(),
            &format!("Submitted code with entrypoint {entrypoint}"),
        );
        info!(role = %solver, round, attempts, "Submission recorded");

        Ok(TurnOutput::new(next).with_usage(usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn problem(budgets: BTreeMap<String, serde_json::Value>) -> Problem {
        Problem {
            id: "p".into(),
            title: "P".into(),
            entrypoint: "solve".into(),
            description: "d".into(),
            constraints: BTreeMap::new(),
            public_tests: vec![],
            budgets,
            round: 1,
        }
    }

    #[test]
    fn test_attempt_budget_defaults_and_clamps() {
        assert_eq!(attempt_budget(&problem(BTreeMap::new())), 2);
        let many = BTreeMap::from([(BUDGET_MAX_ATTEMPTS.to_string(), serde_json::json!(40))]);
        assert_eq!(attempt_budget(&problem(many)), 5);
        let zero = BTreeMap::from([(BUDGET_MAX_ATTEMPTS.to_string(), serde_json::json!("0"))]);
        assert_eq!(attempt_budget(&problem(zero)), 1);
    }

    #[test]
    fn test_entrypoint_mismatch_rejected() {
        let p = problem(BTreeMap::new());
        let ok = parse_submission(r#"{"code": "def solve(): pass", "entrypoint": "solve"}"#, &p);
        assert!(ok.is_ok());
        let inherited = parse_submission(r#"{"code": "def solve(): pass"}"#, &p).unwrap();
        assert_eq!(inherited.language, "python");

        let err = parse_submission(r#"{"code": "def f(): pass", "entrypoint": "f"}"#, &p)
            .unwrap_err();
        assert!(err.is_retriable_in_turn());
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_empty_code_rejected() {
        let p = problem(BTreeMap::new());
        let err = parse_submission(r#"{"code": "   "}"#, &p).unwrap_err();
        assert!(err.to_string().contains("submission code is empty"));
    }
}
