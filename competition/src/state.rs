//! The shared competition record threaded through every turn.
//!
//! A turn receives the whole state by reference and hands back a complete new
//! value; nothing is merged behind the executor's back. Ledgers are
//! append-only and the score totals only grow.
//!
//! Field names in snapshots keep the `coderA`/`coderB` vocabulary so that a
//! serialized state reads the same as the role tokens.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifacts::{Problem, Submission};
use crate::roles::{Persona, Role, Solver, Winner};

/// Lifecycle status of a competition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompetitionStatus {
    /// Waiting for the round controller to issue a problem.
    Preparing,
    /// A problem is current and solvers/reviewer are acting.
    Active,
    /// All rounds reviewed. Terminal.
    Completed,
    /// A turn failed. Terminal.
    Error,
}

impl CompetitionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl std::fmt::Display for CompetitionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Preparing => write!(f, "preparing"),
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Run-wide usage counters. Not persisted beyond the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub total_tokens: u64,
    pub api_calls_made: u64,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration_secs: Option<f64>,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            total_tokens: 0,
            api_calls_made: 0,
            started_at: Utc::now(),
            finished_at: None,
            total_duration_secs: None,
        }
    }

    /// Account the model usage of one successful turn.
    pub fn record_usage(&mut self, model_calls: u64, tokens: u64) {
        self.api_calls_made += model_calls;
        self.total_tokens += tokens;
    }

    /// Stamp the end of the run and return its duration in seconds.
    pub fn finish(&mut self) -> f64 {
        let now = Utc::now();
        let secs = (now - self.started_at).num_milliseconds().max(0) as f64 / 1000.0;
        self.finished_at = Some(now);
        self.total_duration_secs = Some(secs);
        secs
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-round attempt counts for each solver.
///
/// Reset whenever a new problem is issued. A solver records one attempt per
/// model prompt it makes while producing its submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptLedger {
    pub round: u32,
    #[serde(rename = "coderA")]
    pub solver_a: u32,
    #[serde(rename = "coderB")]
    pub solver_b: u32,
}

impl AttemptLedger {
    pub fn reset(&mut self, round: u32) {
        *self = Self {
            round,
            ..Self::default()
        };
    }

    /// Record one attempt and return the running count for this round.
    pub fn record(&mut self, solver: Solver) -> u32 {
        let slot = match solver {
            Solver::A => &mut self.solver_a,
            Solver::B => &mut self.solver_b,
        };
        *slot += 1;
        *slot
    }

    pub fn count(&self, solver: Solver) -> u32 {
        match solver {
            Solver::A => self.solver_a,
            Solver::B => self.solver_b,
        }
    }
}

/// Rejected ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("no current problem for round {round}")]
    NoCurrentProblem { round: u32 },

    #[error("{solver} already submitted for round {round}")]
    AlreadySubmitted { solver: Solver, round: u32 },

    #[error("{solver} has no submission for round {round}")]
    MissingSubmission { solver: Solver, round: u32 },

    #[error("round {round} is past max rounds {max_rounds}")]
    RoundOutOfRange { round: u32, max_rounds: u32 },
}

/// The single shared competition record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionState {
    /// Identifier generated once per run.
    pub run_id: String,

    // ── problem ledger ──
    pub problems: Vec<Problem>,
    pub current_problem: Option<Problem>,

    // ── solvers ──
    #[serde(rename = "coderA_personality")]
    pub solver_a_persona: Persona,
    #[serde(rename = "coderB_personality")]
    pub solver_b_persona: Persona,
    #[serde(rename = "coderA_submissions")]
    pub solver_a_submissions: Vec<Submission>,
    #[serde(rename = "coderB_submissions")]
    pub solver_b_submissions: Vec<Submission>,
    #[serde(rename = "coderA_Score")]
    pub solver_a_score: u32,
    #[serde(rename = "coderB_Score")]
    pub solver_b_score: u32,

    // ── round control ──
    pub current_round: u32,
    pub max_rounds: u32,
    #[serde(rename = "competition_status")]
    pub status: CompetitionStatus,
    pub next_agent: Option<Role>,
    #[serde(default)]
    pub attempts: AttemptLedger,

    // ── history ──
    pub reviewer_comments: Vec<String>,
    pub error_log: Vec<String>,
    pub round_winner: Option<Winner>,
    pub overall_winner: Option<Winner>,

    pub metrics: RunMetrics,
    /// Timestamped notes appended by each role. Prompt hint only.
    pub conversation_context: String,
}

impl CompetitionState {
    /// Fresh state: round 1, `preparing`, round controller to act.
    pub fn new(max_rounds: u32) -> Self {
        let now = Utc::now();
        let run_id = format!(
            "comp_{}_{}",
            now.format("%Y%m%d_%H%M%S"),
            &uuid::Uuid::new_v4().simple().to_string()[..8]
        );
        Self {
            run_id,
            problems: Vec::new(),
            current_problem: None,
            solver_a_persona: Persona::Straightforward,
            solver_b_persona: Persona::ResourceAware,
            solver_a_submissions: Vec::new(),
            solver_b_submissions: Vec::new(),
            solver_a_score: 0,
            solver_b_score: 0,
            current_round: 1,
            max_rounds,
            status: CompetitionStatus::Preparing,
            next_agent: Some(Role::RoundController),
            attempts: AttemptLedger {
                round: 1,
                ..AttemptLedger::default()
            },
            reviewer_comments: Vec::new(),
            error_log: Vec::new(),
            round_winner: None,
            overall_winner: None,
            metrics: RunMetrics::new(),
            conversation_context: String::new(),
        }
    }

    pub fn with_personas(mut self, a: Persona, b: Persona) -> Self {
        self.solver_a_persona = a;
        self.solver_b_persona = b;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn submissions(&self, solver: Solver) -> &[Submission] {
        match solver {
            Solver::A => &self.solver_a_submissions,
            Solver::B => &self.solver_b_submissions,
        }
    }

    /// Most recent submission of a solver.
    pub fn latest_submission(&self, solver: Solver) -> Option<&Submission> {
        self.submissions(solver).last()
    }

    /// The solver's submission for the current problem, if it has made one.
    pub fn current_submission(&self, solver: Solver) -> Option<&Submission> {
        let problem = self.current_problem.as_ref()?;
        self.latest_submission(solver)
            .filter(|s| s.answers(problem))
    }

    pub fn score(&self, solver: Solver) -> u32 {
        match solver {
            Solver::A => self.solver_a_score,
            Solver::B => self.solver_b_score,
        }
    }

    pub fn persona(&self, solver: Solver) -> Persona {
        match solver {
            Solver::A => self.solver_a_persona,
            Solver::B => self.solver_b_persona,
        }
    }

    /// Issue the problem for the current round.
    ///
    /// Stamps the round, keeps ids unique within the run, appends to the
    /// ledger, makes it current, resets solver attempts, and hands the turn
    /// to SolverA. Returns the problem as recorded.
    pub fn issue_problem(&mut self, problem: Problem) -> Result<&Problem, StateError> {
        if self.current_round > self.max_rounds {
            return Err(StateError::RoundOutOfRange {
                round: self.current_round,
                max_rounds: self.max_rounds,
            });
        }

        let mut problem = problem.stamped(self.current_round);
        problem.id = self.unused_problem_id(&problem.id);

        self.problems.push(problem.clone());
        self.current_problem = Some(problem);
        self.attempts.reset(self.current_round);
        self.status = CompetitionStatus::Active;
        self.next_agent = Some(Role::RoundController.next());

        self.current_problem
            .as_ref()
            .ok_or(StateError::NoCurrentProblem {
                round: self.current_round,
            })
    }

    /// `id` if no earlier problem uses it, else `{id}-r{round}`, then
    /// `{id}-r{round}-2`, `-3`, ... until free.
    fn unused_problem_id(&self, id: &str) -> String {
        let taken = |candidate: &str| self.problems.iter().any(|p| p.id == candidate);
        if !taken(id) {
            return id.to_string();
        }
        let base = format!("{}-r{}", id, self.current_round);
        let mut candidate = base.clone();
        let mut n = 2;
        while taken(&candidate) {
            candidate = format!("{base}-{n}");
            n += 1;
        }
        candidate
    }

    /// Append a solver's submission for the current problem and pass the turn on.
    pub fn record_submission(
        &mut self,
        solver: Solver,
        submission: Submission,
    ) -> Result<(), StateError> {
        let round = self.current_round;
        let problem = self
            .current_problem
            .as_ref()
            .ok_or(StateError::NoCurrentProblem { round })?;

        if self.current_submission(solver).is_some() {
            return Err(StateError::AlreadySubmitted { solver, round });
        }

        let submission = submission.stamped(problem);
        match solver {
            Solver::A => self.solver_a_submissions.push(submission),
            Solver::B => self.solver_b_submissions.push(submission),
        }
        self.next_agent = Some(solver.next_role());
        Ok(())
    }

    /// Append a timestamped note to the conversational context.
    pub fn note(&mut self, role: Role, message: &str) {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        self.conversation_context
            .push_str(&format!("\n[{stamp}] {}: {message}", role.label()));
    }

    /// Append to the error ledger. The ledger is never cleared.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.error_log.push(message.into());
    }

    /// Force the terminal error status after recording why.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.record_error(message);
        self.status = CompetitionStatus::Error;
    }

    /// Rounds whose review has been folded into the totals.
    pub fn completed_rounds(&self) -> usize {
        self.reviewer_comments.len()
    }

    /// Compact status line for logs.
    pub fn status_line(&self) -> String {
        format!(
            "[{}] round {}/{} | coderA={} coderB={} | {} problems | {} errors",
            self.status,
            self.current_round,
            self.max_rounds,
            self.solver_a_score,
            self.solver_b_score,
            self.problems.len(),
            self.error_log.len()
        )
    }
}
