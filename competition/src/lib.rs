//! Two-solver coding competition kernel.
//!
//! This library provides:
//! - The shared competition record and its append-only ledgers
//! - The `Agent` contract implemented by the four roles
//! - A turn executor with metrics and failure isolation
//! - A pure router over the closed set of roles
//! - Review validation and score aggregation
//! - The controller loop that drives a run to completion
//!
//! # Turn order
//!
//! ```text
//! moderator → coderA → coderB → reviewer ─┬→ moderator (next round)
//!                                         └→ end (final round)
//! ```
//!
//! No model or sandbox code lives here; concrete agents are supplied by the
//! caller through [`Roster`].

pub mod agent;
pub mod artifacts;
pub mod config;
pub mod controller;
pub mod executor;
pub mod invariants;
pub mod roles;
pub mod router;
pub mod scoring;
pub mod state;

pub use agent::{Agent, AgentError, TurnOutput, Usage};
pub use artifacts::{CodeTest, Complexity, Problem, Submission};
pub use config::{CompetitionConfig, ConfigError, ModelSettings};
pub use controller::{Competition, CompetitionOutcome, Roster, SetupError, TurnRecord};
pub use executor::{MetricsSnapshot, TurnExecutor};
pub use invariants::InvariantViolation;
pub use roles::{Persona, Role, Solver, Winner};
pub use router::{route, Route, Termination};
pub use scoring::{fold_review, RawReview, Review, ReviewError, RubricWeights, Scorecard};
pub use state::{CompetitionState, CompetitionStatus, StateError};
