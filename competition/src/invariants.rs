//! Post-turn invariant check.
//!
//! The executor compares the state an agent handed back against the state it
//! was given. Agents own the whole value for the length of a turn, so this is
//! the one place the append-only and monotonic guarantees are enforced.

use thiserror::Error;

use crate::roles::Solver;
use crate::state::{CompetitionState, CompetitionStatus};

/// A turn returned a state that breaks a ledger or counter guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("run id changed from {before} to {after}")]
    RunIdChanged { before: String, after: String },

    #[error("{ledger} ledger shrank from {before} to {after}")]
    LedgerShrank {
        ledger: &'static str,
        before: usize,
        after: usize,
    },

    #[error("{ledger} ledger entry {index} was rewritten")]
    LedgerRewritten { ledger: &'static str, index: usize },

    #[error("{solver} score decreased from {before} to {after}")]
    ScoreDecreased {
        solver: Solver,
        before: u32,
        after: u32,
    },

    #[error("round went backwards from {before} to {after}")]
    RoundDecreased { before: u32, after: u32 },

    #[error("round {round} exceeds max rounds {max_rounds} while {status}")]
    RoundOutOfRange {
        round: u32,
        max_rounds: u32,
        status: CompetitionStatus,
    },

    #[error("max rounds changed from {before} to {after}")]
    MaxRoundsChanged { before: u32, after: u32 },

    #[error("agent set status to error")]
    ErrorStatusFromAgent,

    #[error("active round has no current problem")]
    ActiveWithoutProblem,
}

fn prefix_preserved<T: PartialEq>(
    ledger: &'static str,
    before: &[T],
    after: &[T],
) -> Result<(), InvariantViolation> {
    if after.len() < before.len() {
        return Err(InvariantViolation::LedgerShrank {
            ledger,
            before: before.len(),
            after: after.len(),
        });
    }
    match before.iter().zip(after).position(|(b, a)| b != a) {
        Some(index) => Err(InvariantViolation::LedgerRewritten { ledger, index }),
        None => Ok(()),
    }
}

/// Verify `next` is a legal successor of `prev` for a successful turn.
pub fn verify_turn(
    prev: &CompetitionState,
    next: &CompetitionState,
) -> Result<(), InvariantViolation> {
    if prev.run_id != next.run_id {
        return Err(InvariantViolation::RunIdChanged {
            before: prev.run_id.clone(),
            after: next.run_id.clone(),
        });
    }
    if prev.max_rounds != next.max_rounds {
        return Err(InvariantViolation::MaxRoundsChanged {
            before: prev.max_rounds,
            after: next.max_rounds,
        });
    }

    prefix_preserved("problem", &prev.problems, &next.problems)?;
    prefix_preserved(
        "coderA submission",
        &prev.solver_a_submissions,
        &next.solver_a_submissions,
    )?;
    prefix_preserved(
        "coderB submission",
        &prev.solver_b_submissions,
        &next.solver_b_submissions,
    )?;
    prefix_preserved("reviewer comment", &prev.reviewer_comments, &next.reviewer_comments)?;
    prefix_preserved("error", &prev.error_log, &next.error_log)?;

    for solver in [Solver::A, Solver::B] {
        let (before, after) = (prev.score(solver), next.score(solver));
        if after < before {
            return Err(InvariantViolation::ScoreDecreased {
                solver,
                before,
                after,
            });
        }
    }

    if next.current_round < prev.current_round {
        return Err(InvariantViolation::RoundDecreased {
            before: prev.current_round,
            after: next.current_round,
        });
    }
    if !next.status.is_terminal() && next.current_round > next.max_rounds {
        return Err(InvariantViolation::RoundOutOfRange {
            round: next.current_round,
            max_rounds: next.max_rounds,
            status: next.status,
        });
    }

    if next.status == CompetitionStatus::Error {
        return Err(InvariantViolation::ErrorStatusFromAgent);
    }
    if next.status == CompetitionStatus::Active && next.current_problem.is_none() {
        return Err(InvariantViolation::ActiveWithoutProblem);
    }

    Ok(())
}
