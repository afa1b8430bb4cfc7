//! The agent contract and turn-level error taxonomy.
//!
//! An agent takes the current state by reference and returns a complete new
//! state. It never raises tool failures: those are turned into strings inside
//! the model-call loop. Anything an agent does return as `Err` is fatal to
//! the run once it reaches the executor.
//!
//! ## Error kinds
//!
//! | Variant            | Retried inside the turn |
//! |--------------------|-------------------------|
//! | Model              | by the model adapter (transient only) |
//! | OutputValidation   | by solvers, within their attempt budget |
//! | MissingInput       | no |
//! | Review             | no |
//! | State              | no |
//! | Invariant          | no (raised by the executor) |
//! | Panicked           | no (raised by the executor) |
//! | Internal           | no |
//! | Spent              | as the wrapped error; carries usage already spent |

use async_trait::async_trait;
use thiserror::Error;

use crate::invariants::InvariantViolation;
use crate::roles::Role;
use crate::scoring::ReviewError;
use crate::state::{CompetitionState, StateError};

/// Failure of a single agent turn.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The model-call collaborator failed after its own retries.
    #[error("model call failed: {0}")]
    Model(String),

    /// The produced artifact could not be parsed or validated.
    #[error("output validation failed: {0}")]
    OutputValidation(String),

    /// A role precondition on the incoming state was not met.
    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("review rejected: {0}")]
    Review(#[from] ReviewError),

    #[error("ledger update rejected: {0}")]
    State(#[from] StateError),

    #[error("invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),

    /// The agent panicked; caught at the executor boundary.
    #[error("agent panicked: {0}")]
    Panicked(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),

    /// A failure raised after the turn had already spent model usage.
    #[error("{source}")]
    Spent {
        usage: Usage,
        source: Box<AgentError>,
    },
}

impl AgentError {
    /// Whether a fresh attempt inside the same turn may succeed.
    pub fn is_retriable_in_turn(&self) -> bool {
        match self {
            Self::Spent { source, .. } => source.is_retriable_in_turn(),
            other => matches!(other, Self::OutputValidation(_)),
        }
    }

    /// Attach usage spent before the failure. Usage already attached is kept.
    pub fn with_usage(self, usage: Usage) -> Self {
        if usage == Usage::default() {
            return self;
        }
        match self {
            Self::Spent {
                usage: mut spent,
                source,
            } => {
                spent.add(usage);
                Self::Spent {
                    usage: spent,
                    source,
                }
            }
            other => Self::Spent {
                usage,
                source: Box::new(other),
            },
        }
    }

    /// Usage spent by the failed turn, zero when none was attached.
    pub fn usage(&self) -> Usage {
        match self {
            Self::Spent { usage, .. } => *usage,
            _ => Usage::default(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::OutputValidation(message.into())
    }
}

/// What a successful turn hands back to the executor.
#[derive(Debug, Clone)]
pub struct TurnOutput {
    /// The full successor state. Authoritative.
    pub state: CompetitionState,
    /// Model prompts issued while producing it.
    pub model_calls: u64,
    /// Tool invocations made by those prompts.
    pub tool_calls: u64,
    /// Estimated tokens consumed by those prompts.
    pub tokens: u64,
}

impl TurnOutput {
    pub fn new(state: CompetitionState) -> Self {
        Self {
            state,
            model_calls: 0,
            tool_calls: 0,
            tokens: 0,
        }
    }

    pub fn usage(&self) -> Usage {
        Usage {
            model_calls: self.model_calls,
            tool_calls: self.tool_calls,
            tokens: self.tokens,
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.model_calls = usage.model_calls;
        self.tool_calls = usage.tool_calls;
        self.tokens = usage.tokens;
        self
    }
}

/// Model usage accumulated across the prompts of one turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub model_calls: u64,
    pub tool_calls: u64,
    pub tokens: u64,
}

impl Usage {
    pub fn add(&mut self, other: Usage) {
        self.model_calls += other.model_calls;
        self.tool_calls += other.tool_calls;
        self.tokens += other.tokens;
    }
}

/// One role's behaviour.
#[async_trait]
pub trait Agent: Send + Sync {
    /// The role this agent plays.
    fn role(&self) -> Role;

    /// Produce the successor state.
    async fn act(&self, state: &CompetitionState) -> Result<TurnOutput, AgentError>;
}
