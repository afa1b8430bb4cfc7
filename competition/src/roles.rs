//! Competition roles, solver identities and winners.
//!
//! Role tokens keep the wire names used in state snapshots
//! (`moderator`, `coderA`, `coderB`, `reviewer`). The set is closed: a
//! snapshot carrying any other token fails to deserialize.

use serde::{Deserialize, Serialize};

/// One of the four fixed roles that take turns in a competition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Issues the problem for each round.
    #[serde(rename = "moderator")]
    RoundController,
    /// First solver (clarity-biased by default).
    #[serde(rename = "coderA")]
    SolverA,
    /// Second solver (efficiency-biased by default).
    #[serde(rename = "coderB")]
    SolverB,
    /// Scores both submissions and folds the round into the totals.
    #[serde(rename = "reviewer")]
    Reviewer,
}

impl Role {
    /// All roles in turn order.
    pub const ALL: [Role; 4] = [
        Role::RoundController,
        Role::SolverA,
        Role::SolverB,
        Role::Reviewer,
    ];

    /// Wire token used in snapshots and logs.
    pub fn token(self) -> &'static str {
        match self {
            Self::RoundController => "moderator",
            Self::SolverA => "coderA",
            Self::SolverB => "coderB",
            Self::Reviewer => "reviewer",
        }
    }

    /// Human-facing label used in conversational context notes.
    pub fn label(self) -> &'static str {
        match self {
            Self::RoundController => "Moderator",
            Self::SolverA => "CoderA",
            Self::SolverB => "CoderB",
            Self::Reviewer => "Reviewer",
        }
    }

    /// The solver identity behind this role, if it is a solver.
    pub fn solver(self) -> Option<Solver> {
        match self {
            Self::SolverA => Some(Solver::A),
            Self::SolverB => Some(Solver::B),
            Self::RoundController | Self::Reviewer => None,
        }
    }

    /// Fixed hand-off order inside a round. The reviewer's real successor
    /// depends on the round count and is decided when its review is folded.
    pub fn next(self) -> Role {
        match self {
            Self::RoundController => Self::SolverA,
            Self::SolverA => Self::SolverB,
            Self::SolverB => Self::Reviewer,
            Self::Reviewer => Self::RoundController,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// The two competing solvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Solver {
    #[serde(rename = "coderA")]
    A,
    #[serde(rename = "coderB")]
    B,
}

impl Solver {
    pub fn role(self) -> Role {
        match self {
            Self::A => Role::SolverA,
            Self::B => Role::SolverB,
        }
    }

    /// Role that acts after this solver submits.
    pub fn next_role(self) -> Role {
        match self {
            Self::A => Role::SolverB,
            Self::B => Role::Reviewer,
        }
    }
}

impl std::fmt::Display for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.role().token())
    }
}

/// Winner of a round or of the whole competition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Winner {
    #[serde(rename = "coderA")]
    SolverA,
    #[serde(rename = "coderB")]
    SolverB,
    #[serde(rename = "draw")]
    Draw,
}

impl Winner {
    /// Strict comparison of two totals; exact equality is a draw.
    pub fn from_totals(a: u32, b: u32) -> Self {
        match a.cmp(&b) {
            std::cmp::Ordering::Greater => Self::SolverA,
            std::cmp::Ordering::Less => Self::SolverB,
            std::cmp::Ordering::Equal => Self::Draw,
        }
    }
}

impl std::fmt::Display for Winner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SolverA => write!(f, "coderA"),
            Self::SolverB => write!(f, "coderB"),
            Self::Draw => write!(f, "draw"),
        }
    }
}

/// Behavioural bias of a solver. Only affects the solver's prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    #[default]
    Default,
    /// Favours clarity and maintainability.
    Straightforward,
    /// Favours efficiency under large inputs.
    #[serde(rename = "resourceaware")]
    ResourceAware,
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Straightforward => write!(f, "straightforward"),
            Self::ResourceAware => write!(f, "resourceaware"),
        }
    }
}
