//! The four role agents and the factory that wires them to rig.
//!
//! Each role has a free builder returning an `OaiAgent` and an `Agent` impl
//! that only sees a [`ModelCall`]. `AgentFactory` wraps the rig agents in
//! [`RigModel`] and assembles a [`Roster`].

pub mod output;
pub mod reviewer;
pub mod round_controller;
pub mod solver;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use competition::{Role, Roster, Solver};
use rig::providers::openai;

use crate::config::ArenaConfig;
use crate::model::{ModelCall, OaiAgent, RigModel};
use crate::sandbox::Sandbox;

pub use reviewer::ReviewerAgent;
pub use round_controller::RoundControllerAgent;
pub use solver::SolverAgent;

/// Builds every role's agent from an `ArenaConfig`.
pub struct AgentFactory {
    pub client: openai::CompletionsClient,
    pub config: ArenaConfig,
    sandbox: Arc<Sandbox>,
}

impl AgentFactory {
    pub fn new(config: &ArenaConfig) -> Result<Self> {
        config.validate()?;
        let client = config.client()?;
        let sandbox = Arc::new(Sandbox::new(
            config.sandbox.interpreter.clone(),
            Duration::from_secs(config.sandbox.timeout_secs),
        ));
        Ok(Self {
            client,
            config: config.clone(),
            sandbox,
        })
    }

    pub fn sandbox(&self) -> Arc<Sandbox> {
        self.sandbox.clone()
    }

    /// Wall-clock allowance for one model call by `role`.
    pub fn allowance(&self, role: Role) -> Duration {
        let secs = match role {
            Role::Reviewer => self.config.competition.review_time_secs,
            _ => self.config.competition.time_per_round_secs,
        };
        Duration::from_secs(secs)
    }

    fn wrap(&self, agent: OaiAgent, role: Role) -> Arc<dyn ModelCall> {
        Arc::new(RigModel::new(
            agent,
            role,
            self.config.max_model_retries,
            self.config.max_tool_calls_per_turn,
            self.allowance(role),
        ))
    }

    pub fn build_round_controller(&self) -> RoundControllerAgent {
        let settings = &self.config.competition.model;
        let generator = self.wrap(
            round_controller::build_problem_generator(&self.client, settings),
            Role::RoundController,
        );
        let agent = round_controller::build_round_controller(
            &self.client,
            settings,
            generator,
            self.config.max_turns_per_call,
        );
        RoundControllerAgent::new(self.wrap(agent, Role::RoundController))
    }

    pub fn build_solver(&self, solver: Solver) -> SolverAgent {
        let agent = solver::build_solver(
            &self.client,
            &self.config.competition.model,
            solver,
            self.sandbox(),
            self.config.max_turns_per_call,
        );
        SolverAgent::new(solver, self.wrap(agent, solver.role()))
    }

    pub fn build_reviewer(&self) -> ReviewerAgent {
        let rubric = self.config.competition.scoring_rules;
        let agent = reviewer::build_reviewer(
            &self.client,
            &self.config.competition.model,
            &rubric,
            self.sandbox(),
            self.config.max_turns_per_call,
        );
        ReviewerAgent::new(self.wrap(agent, Role::Reviewer), rubric)
    }

    /// One agent per role, ready for `Competition::new`.
    pub fn roster(&self) -> Roster {
        Roster {
            round_controller: Box::new(self.build_round_controller()),
            solver_a: Box::new(self.build_solver(Solver::A)),
            solver_b: Box::new(self.build_solver(Solver::B)),
            reviewer: Box::new(self.build_reviewer()),
        }
    }
}
