//! Round controller: issues the problem for the current round.

use std::sync::Arc;

use async_trait::async_trait;
use competition::{Agent, AgentError, CompetitionState, ModelSettings, Problem, Role, TurnOutput};
use rig::client::CompletionClient;
use rig::providers::openai;
use tracing::info;

use super::output::parse_artifact;
use crate::model::{ModelCall, OaiAgent};
use crate::prompts;
use crate::tools::FetchProblemTool;

/// Build the model behind `fetch_code_problem`. No tools.
pub fn build_problem_generator(
    client: &openai::CompletionsClient,
    settings: &ModelSettings,
) -> OaiAgent {
    client
        .agent(&settings.model_name)
        .name("problem_generator")
        .description("Drafts one coding problem as JSON.")
        .preamble(prompts::PROBLEM_GENERATOR_PREAMBLE)
        .temperature(settings.temperature)
        .max_tokens(settings.max_tokens)
        .build()
}

/// Build the round controller model.
///
/// Tools: fetch_code_problem.
pub fn build_round_controller(
    client: &openai::CompletionsClient,
    settings: &ModelSettings,
    generator: Arc<dyn ModelCall>,
    max_turns: usize,
) -> OaiAgent {
    client
        .agent(&settings.model_name)
        .name(Role::RoundController.token())
        .description("Moderator. Issues one fair, testable problem per round.")
        .preamble(prompts::ROUND_CONTROLLER_PREAMBLE)
        .temperature(settings.temperature)
        .max_tokens(settings.max_tokens)
        .tool(FetchProblemTool::new(generator))
        .default_max_turns(max_turns)
        .build()
}

pub struct RoundControllerAgent {
    model: Arc<dyn ModelCall>,
}

impl RoundControllerAgent {
    pub fn new(model: Arc<dyn ModelCall>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Agent for RoundControllerAgent {
    fn role(&self) -> Role {
        Role::RoundController
    }

    async fn act(&self, state: &CompetitionState) -> Result<TurnOutput, AgentError> {
        let reply = self
            .model
            .complete(&prompts::round_controller_task(state))
            .await?;

        let spent = |e: AgentError| e.with_usage(reply.usage);
        let problem: Problem = parse_artifact(&reply.text, "problem").map_err(spent)?;
        problem.validate().map_err(|e| spent(AgentError::validation(e)))?;

        let mut next = state.clone();
        let round = next.current_round;
        let issued = next.issue_problem(problem).map_err(|e| spent(e.into()))?;
        let note = format!("Selected problem '{}' for round {round}", issued.title);
        info!(
            round,
            problem_id = %issued.id,
            public_tests = issued.public_tests.len(),
            "Problem issued"
        );
        next.note(Role::RoundController, &note);

        Ok(TurnOutput::new(next).with_usage(reply.usage))
    }
}
