//! Reviewer: scores both submissions and folds the round into the totals.

use std::sync::Arc;

use async_trait::async_trait;
use competition::scoring::RoundAdvance;
use competition::{
    fold_review, Agent, AgentError, CompetitionState, ModelSettings, RawReview, Role,
    RubricWeights, Solver, TurnOutput,
};
use rig::client::CompletionClient;
use rig::providers::openai;
use tracing::info;

use super::output::parse_artifact;
use crate::model::{ModelCall, OaiAgent};
use crate::prompts;
use crate::sandbox::Sandbox;
use crate::tools::{ExecuteCodeTool, RunTestSuiteTool};

/// Build the reviewer model with the rubric maxima in its preamble.
///
/// Tools: execute_code_sandbox, run_test_suite.
pub fn build_reviewer(
    client: &openai::CompletionsClient,
    settings: &ModelSettings,
    rubric: &RubricWeights,
    sandbox: Arc<Sandbox>,
    max_turns: usize,
) -> OaiAgent {
    client
        .agent(&settings.model_name)
        .name(Role::Reviewer.token())
        .description("Runs, tests and scores both submissions against the rubric.")
        .preamble(&prompts::reviewer_preamble(rubric))
        .temperature(settings.temperature)
        .max_tokens(settings.max_tokens)
        .tool(ExecuteCodeTool::new(sandbox.clone()))
        .tool(RunTestSuiteTool::new(sandbox))
        .default_max_turns(max_turns)
        .build()
}

pub struct ReviewerAgent {
    model: Arc<dyn ModelCall>,
    rubric: RubricWeights,
}

impl ReviewerAgent {
    pub fn new(model: Arc<dyn ModelCall>, rubric: RubricWeights) -> Self {
        Self { model, rubric }
    }
}

#[async_trait]
impl Agent for ReviewerAgent {
    fn role(&self) -> Role {
        Role::Reviewer
    }

    async fn act(&self, state: &CompetitionState) -> Result<TurnOutput, AgentError> {
        let round = state.current_round;
        if state.current_problem.is_none() {
            return Err(AgentError::MissingInput(format!(
                "no current problem for round {round}"
            )));
        }
        for solver in [Solver::A, Solver::B] {
            if state.current_submission(solver).is_none() {
                return Err(AgentError::MissingInput(format!(
                    "{solver} has no submission for round {round}"
                )));
            }
        }

        let reply = self
            .model
            .complete(&prompts::reviewer_task(state, &self.rubric))
            .await?;
        let spent = |e: AgentError| e.with_usage(reply.usage);
        let raw: RawReview = parse_artifact(&reply.text, "review").map_err(spent)?;
        let review = raw.validate(&self.rubric).map_err(|e| spent(e.into()))?;

        let mut next = state.clone();
        match fold_review(&mut next, &review).map_err(|e| spent(e.into()))? {
            RoundAdvance::NextRound(next_round) => info!(
                round,
                next_round,
                coder_a = next.solver_a_score,
                coder_b = next.solver_b_score,
                "Round reviewed"
            ),
            RoundAdvance::Completed(winner) => info!(
                round,
                coder_a = next.solver_a_score,
                coder_b = next.solver_b_score,
                winner = %winner,
                "Final round reviewed"
            ),
        }

        Ok(TurnOutput::new(next).with_usage(reply.usage))
    }
}
