//! Competition controller: drives turns until the router says stop.
//!
//! ```text
//! Competition::run()
//!   → initial state (round 1, preparing, moderator)
//!   → loop:
//!       route(state)          → Turn(role) or End(termination)
//!       check turn budget
//!       executor[role].execute(state)
//!   → stamp run duration, return final state + transcript
//! ```
//!
//! Each executor owns its agent's metrics. The controller only reads them
//! through [`Competition::agent_metrics`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::Agent;
use crate::config::{CompetitionConfig, ConfigError};
use crate::executor::{MetricsSnapshot, TurnExecutor};
use crate::roles::{Persona, Role};
use crate::router::{route, Route, Termination};
use crate::state::CompetitionState;

/// Construction failure.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("roster slot {slot} holds an agent playing {found}")]
    RoleMismatch { slot: Role, found: Role },
}

/// The four agents of a competition, one per role.
pub struct Roster {
    pub round_controller: Box<dyn Agent>,
    pub solver_a: Box<dyn Agent>,
    pub solver_b: Box<dyn Agent>,
    pub reviewer: Box<dyn Agent>,
}

/// One executed turn, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub index: u32,
    pub role: Role,
    pub round: u32,
    pub elapsed_ms: u64,
    pub succeeded: bool,
}

/// Final result of a run.
#[derive(Debug, Clone)]
pub struct CompetitionOutcome {
    pub state: CompetitionState,
    pub termination: Termination,
    pub turns: Vec<TurnRecord>,
}

struct Executors {
    round_controller: TurnExecutor,
    solver_a: TurnExecutor,
    solver_b: TurnExecutor,
    reviewer: TurnExecutor,
}

impl Executors {
    fn get_mut(&mut self, role: Role) -> &mut TurnExecutor {
        match role {
            Role::RoundController => &mut self.round_controller,
            Role::SolverA => &mut self.solver_a,
            Role::SolverB => &mut self.solver_b,
            Role::Reviewer => &mut self.reviewer,
        }
    }

    fn get(&self, role: Role) -> &TurnExecutor {
        match role {
            Role::RoundController => &self.round_controller,
            Role::SolverA => &self.solver_a,
            Role::SolverB => &self.solver_b,
            Role::Reviewer => &self.reviewer,
        }
    }
}

fn checked(slot: Role, agent: Box<dyn Agent>) -> Result<TurnExecutor, SetupError> {
    let found = agent.role();
    if found != slot {
        return Err(SetupError::RoleMismatch { slot, found });
    }
    Ok(TurnExecutor::new(agent))
}

/// Upper bound on turns for a run starting at `state`. A well-formed run
/// uses exactly this many when it starts at the top of a round.
pub fn turn_budget(state: &CompetitionState) -> u32 {
    let remaining = state
        .max_rounds
        .saturating_sub(state.current_round)
        .saturating_add(1);
    remaining.saturating_mul(Role::ALL.len() as u32)
}

/// Drives one competition.
pub struct Competition {
    config: CompetitionConfig,
    executors: Executors,
    personas: (Persona, Persona),
}

impl Competition {
    pub fn new(config: CompetitionConfig, roster: Roster) -> Result<Self, SetupError> {
        config.validate()?;
        let executors = Executors {
            round_controller: checked(Role::RoundController, roster.round_controller)?,
            solver_a: checked(Role::SolverA, roster.solver_a)?,
            solver_b: checked(Role::SolverB, roster.solver_b)?,
            reviewer: checked(Role::Reviewer, roster.reviewer)?,
        };
        Ok(Self {
            config,
            executors,
            personas: (Persona::Straightforward, Persona::ResourceAware),
        })
    }

    /// Override the default solver personas.
    pub fn with_personas(mut self, solver_a: Persona, solver_b: Persona) -> Self {
        self.personas = (solver_a, solver_b);
        self
    }

    pub fn config(&self) -> &CompetitionConfig {
        &self.config
    }

    /// Fresh state for a new run.
    pub fn initial_state(&self) -> CompetitionState {
        CompetitionState::new(self.config.max_rounds)
            .with_personas(self.personas.0, self.personas.1)
    }

    /// Run a fresh competition to a terminal state.
    pub async fn run(&mut self) -> CompetitionOutcome {
        let state = self.initial_state();
        self.run_from(state).await
    }

    /// Drive a caller-supplied state to a terminal state.
    pub async fn run_from(&mut self, mut state: CompetitionState) -> CompetitionOutcome {
        let budget = turn_budget(&state);
        let mut turns: Vec<TurnRecord> = Vec::new();

        tracing::info!(
            run_id = %state.run_id,
            round = state.current_round,
            max_rounds = state.max_rounds,
            budget,
            "Competition starting"
        );

        let round_in_range = (1..=state.max_rounds).contains(&state.current_round);
        if !state.is_terminal() && !round_in_range {
            state.fail(format!(
                "Controller Error: round {} outside 1..={}",
                state.current_round, state.max_rounds
            ));
        }

        let termination = loop {
            let role = match route(&state) {
                Route::End(termination) => break termination,
                Route::Turn(role) => role,
            };

            if turns.len() as u32 >= budget {
                tracing::warn!(budget, round = state.current_round, "Turn budget exhausted");
                state.fail(format!("Controller Error: turn budget of {budget} exhausted"));
                break Termination::Failed;
            }

            let round = state.current_round;
            let result = self.executors.get_mut(role).execute(state).await;
            turns.push(TurnRecord {
                index: turns.len() as u32 + 1,
                role,
                round,
                elapsed_ms: result.elapsed.as_millis() as u64,
                succeeded: result.succeeded,
            });
            state = result.state;
            tracing::debug!(status = %state.status_line(), "Turn applied");
        };

        if termination == Termination::Stalled {
            state.fail(format!(
                "Controller Error: run stalled in status {} at round {} with no next agent",
                state.status, state.current_round
            ));
        }

        let secs = state.metrics.finish();
        tracing::info!(
            run_id = %state.run_id,
            termination = %termination,
            status = %state.status,
            turns = turns.len(),
            coder_a = state.solver_a_score,
            coder_b = state.solver_b_score,
            winner = ?state.overall_winner,
            duration_secs = secs,
            "Competition finished"
        );

        CompetitionOutcome {
            state,
            termination,
            turns,
        }
    }

    /// Per-role metrics snapshot.
    pub fn agent_metrics(&self) -> BTreeMap<Role, MetricsSnapshot> {
        Role::ALL
            .into_iter()
            .map(|role| (role, self.executors.get(role).metrics()))
            .collect()
    }
}
