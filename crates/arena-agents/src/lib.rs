//! Rig-backed agents for two-solver coding competitions.
//!
//! The `competition` crate owns the state machine; this crate supplies the
//! collaborators it drives:
//!
//! - `agents`: the round controller, two solvers and reviewer, plus the
//!   factory that wires them to an OpenAI-compatible endpoint
//! - `model`: the `ModelCall` seam with transient-error retry
//! - `turn_hook`: per-call tool accounting and budget enforcement
//! - `tools` / `sandbox`: problem drafting and local Python execution
//! - `config`: TOML + environment configuration
//! - `report`: the JSON run report

pub mod agents;
pub mod config;
pub mod model;
pub mod prompts;
pub mod report;
pub mod sandbox;
pub mod tools;
pub mod turn_hook;

pub use agents::AgentFactory;
pub use config::ArenaConfig;
pub use model::{ModelCall, ModelReply};
pub use report::RunReport;
