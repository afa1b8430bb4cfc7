//! Turn routing: a pure function of the state.
//!
//! The next-agent field is a closed enum, so every non-terminal state names
//! exactly one role. The only ambiguous shape left is a live status with no
//! next agent; that is reported as [`Termination::Stalled`] rather than
//! folded into normal completion.

use serde::{Deserialize, Serialize};

use crate::roles::Role;
use crate::state::{CompetitionState, CompetitionStatus};

/// Why the run loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// All rounds reviewed.
    Completed,
    /// A turn failed and status is `error`.
    Failed,
    /// Status is still live but no role was handed the turn.
    Stalled,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Stalled => write!(f, "stalled"),
        }
    }
}

/// Routing decision for the next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Turn(Role),
    End(Termination),
}

impl Route {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::End(_))
    }
}

/// Decide who acts next. Never mutates the state.
pub fn route(state: &CompetitionState) -> Route {
    match (state.status, state.next_agent) {
        (CompetitionStatus::Error, _) => Route::End(Termination::Failed),
        (CompetitionStatus::Completed, _) => Route::End(Termination::Completed),
        (CompetitionStatus::Preparing | CompetitionStatus::Active, None) => {
            Route::End(Termination::Stalled)
        }
        (CompetitionStatus::Preparing | CompetitionStatus::Active, Some(role)) => Route::Turn(role),
    }
}
