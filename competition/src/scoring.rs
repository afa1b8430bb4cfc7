//! Review scoring: bounded sub-scores and aggregation into running totals.
//!
//! The reviewer's structured output arrives as a flat [`RawReview`]. It is
//! checked against the rubric maxima before anything touches the state; a
//! review with any out-of-range sub-score is rejected whole. A valid
//! [`Review`] is folded into the totals by [`fold_review`] and then dropped,
//! leaving only its audit comment behind.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::roles::{Role, Solver, Winner};
use crate::state::{CompetitionState, CompetitionStatus, StateError};

/// Per-criterion maximum points. Defaults to 5/3/2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RubricWeights {
    pub correctness: u32,
    pub efficiency: u32,
    pub code_quality: u32,
}

impl Default for RubricWeights {
    fn default() -> Self {
        Self {
            correctness: 5,
            efficiency: 3,
            code_quality: 2,
        }
    }
}

impl RubricWeights {
    /// Best possible round total for one solver.
    pub fn max_total(&self) -> u32 {
        self.correctness + self.efficiency + self.code_quality
    }

    pub fn max_for(&self, criterion: Criterion) -> u32 {
        match criterion {
            Criterion::Correctness => self.correctness,
            Criterion::Efficiency => self.efficiency,
            Criterion::CodeQuality => self.code_quality,
        }
    }
}

/// Scoring criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Correctness,
    Efficiency,
    CodeQuality,
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Correctness => write!(f, "correctness"),
            Self::Efficiency => write!(f, "efficiency"),
            Self::CodeQuality => write!(f, "code_quality"),
        }
    }
}

/// A review rejected before folding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    #[error("{solver} {criterion} score {score} outside 0..={max}")]
    OutOfBounds {
        solver: Solver,
        criterion: Criterion,
        score: i64,
        max: u32,
    },
}

/// Reviewer output as produced by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReview {
    #[serde(rename = "coderA_correctness_score")]
    pub solver_a_correctness: i64,
    #[serde(rename = "coderA_efficiency_score")]
    pub solver_a_efficiency: i64,
    #[serde(rename = "coderA_quality_score", alias = "coderA_code_quality_score")]
    pub solver_a_code_quality: i64,
    #[serde(rename = "coderA_feedback", default)]
    pub solver_a_feedback: String,

    #[serde(rename = "coderB_correctness_score")]
    pub solver_b_correctness: i64,
    #[serde(rename = "coderB_efficiency_score")]
    pub solver_b_efficiency: i64,
    #[serde(rename = "coderB_quality_score", alias = "coderB_code_quality_score")]
    pub solver_b_code_quality: i64,
    #[serde(rename = "coderB_feedback", default)]
    pub solver_b_feedback: String,

    pub round_winner: Winner,
    #[serde(default)]
    pub summary: String,
}

/// One solver's scores for a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scorecard {
    pub correctness: u32,
    pub efficiency: u32,
    pub code_quality: u32,
    pub feedback: String,
}

impl Scorecard {
    pub fn total(&self) -> u32 {
        self.correctness + self.efficiency + self.code_quality
    }
}

/// A validated review of one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub solver_a: Scorecard,
    pub solver_b: Scorecard,
    pub round_winner: Winner,
    pub summary: String,
}

impl Review {
    pub fn scorecard(&self, solver: Solver) -> &Scorecard {
        match solver {
            Solver::A => &self.solver_a,
            Solver::B => &self.solver_b,
        }
    }
}

fn bounded(
    solver: Solver,
    criterion: Criterion,
    score: i64,
    rubric: &RubricWeights,
) -> Result<u32, ReviewError> {
    let max = rubric.max_for(criterion);
    if score < 0 || score > i64::from(max) {
        return Err(ReviewError::OutOfBounds {
            solver,
            criterion,
            score,
            max,
        });
    }
    // 0 <= score <= u32::MAX here
    Ok(score as u32)
}

impl RawReview {
    /// Check every sub-score against the rubric and build a [`Review`].
    pub fn validate(self, rubric: &RubricWeights) -> Result<Review, ReviewError> {
        let check = |solver, criterion, score| bounded(solver, criterion, score, rubric);
        let solver_a = Scorecard {
            correctness: check(Solver::A, Criterion::Correctness, self.solver_a_correctness)?,
            efficiency: check(Solver::A, Criterion::Efficiency, self.solver_a_efficiency)?,
            code_quality: check(Solver::A, Criterion::CodeQuality, self.solver_a_code_quality)?,
            feedback: self.solver_a_feedback,
        };
        let solver_b = Scorecard {
            correctness: check(Solver::B, Criterion::Correctness, self.solver_b_correctness)?,
            efficiency: check(Solver::B, Criterion::Efficiency, self.solver_b_efficiency)?,
            code_quality: check(Solver::B, Criterion::CodeQuality, self.solver_b_code_quality)?,
            feedback: self.solver_b_feedback,
        };
        Ok(Review {
            solver_a,
            solver_b,
            round_winner: self.round_winner,
            summary: self.summary,
        })
    }
}

/// What happened to the round counter after a fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundAdvance {
    /// Rounds remain; the round controller opens the returned round.
    NextRound(u32),
    /// Final round reviewed; the run is complete.
    Completed(Winner),
}

/// Audit line retained in history for one reviewed round.
pub fn review_comment(round: u32, review: &Review) -> String {
    format!(
        "Round {round} - SolverA: {} points ({}), SolverB: {} points ({})",
        review.solver_a.total(),
        review.solver_a.feedback,
        review.solver_b.total(),
        review.solver_b.feedback
    )
}

/// Fold a validated review into the running totals and advance the round.
///
/// Requires both solvers to have submitted for the current problem. On the
/// final round the overall winner is decided by strict comparison and the
/// run completes with no next agent. Otherwise the round counter moves up by
/// one and the round controller is handed the turn.
pub fn fold_review(
    state: &mut CompetitionState,
    review: &Review,
) -> Result<RoundAdvance, StateError> {
    let round = state.current_round;
    if state.current_problem.is_none() {
        return Err(StateError::NoCurrentProblem { round });
    }
    for solver in [Solver::A, Solver::B] {
        if state.current_submission(solver).is_none() {
            return Err(StateError::MissingSubmission { solver, round });
        }
    }

    let a = review.solver_a.total();
    let b = review.solver_b.total();
    state.solver_a_score = state.solver_a_score.saturating_add(a);
    state.solver_b_score = state.solver_b_score.saturating_add(b);
    state.reviewer_comments.push(review_comment(round, review));
    state.round_winner = Some(review.round_winner);

    state.note(
        Role::Reviewer,
        &format!(
            "Round {round} winner: {}. Summary: {}",
            review.round_winner, review.summary
        ),
    );

    tracing::info!(
        round,
        round_a = a,
        round_b = b,
        total_a = state.solver_a_score,
        total_b = state.solver_b_score,
        winner = %review.round_winner,
        "Folded round review"
    );

    if round >= state.max_rounds {
        let overall = Winner::from_totals(state.solver_a_score, state.solver_b_score);
        state.overall_winner = Some(overall);
        state.status = CompetitionStatus::Completed;
        state.next_agent = None;
        Ok(RoundAdvance::Completed(overall))
    } else {
        state.current_round = round + 1;
        state.next_agent = Some(Role::RoundController);
        state.status = CompetitionStatus::Preparing;
        Ok(RoundAdvance::NextRound(state.current_round))
    }
}
