//! Immutable artifacts appended to the competition ledgers.
//!
//! Problems and submissions are parsed from model output, stamped with the
//! round they belong to, validated, and never mutated afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Budget key for the advisory solver attempt ceiling.
pub const BUDGET_MAX_ATTEMPTS: &str = "max_attempts";
/// Budget key for seconds allowed per attempt.
pub const BUDGET_TIME_PER_ATTEMPT: &str = "time_per_attempt";

/// One public test case attached to a problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeTest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub input: serde_json::Value,
    #[serde(default)]
    pub expected_output: serde_json::Value,
}

/// A coding problem issued by the round controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    /// Unique within a run.
    pub id: String,
    pub title: String,
    /// Function or file name solvers must expose.
    pub entrypoint: String,
    pub description: String,
    #[serde(default)]
    pub constraints: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub public_tests: Vec<CodeTest>,
    /// Attempt and time limits. Values may arrive as numbers or numeric strings.
    #[serde(default)]
    pub budgets: BTreeMap<String, serde_json::Value>,
    /// Round that issued this problem (stamped by the round controller).
    #[serde(default)]
    pub round: u32,
}

impl Problem {
    /// Check the fields a solver needs are present.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("problem id is empty".into());
        }
        if self.title.trim().is_empty() {
            return Err("problem title is empty".into());
        }
        if self.entrypoint.trim().is_empty() {
            return Err("problem entrypoint is empty".into());
        }
        if self.description.trim().is_empty() {
            return Err("problem description is empty".into());
        }
        Ok(())
    }

    /// Numeric budget value, accepting integers or numeric strings.
    pub fn budget(&self, key: &str) -> Option<u64> {
        match self.budgets.get(key)? {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Return the problem stamped with its issuing round.
    pub fn stamped(mut self, round: u32) -> Self {
        self.round = round;
        self
    }
}

/// Big-O estimate reported by a solver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complexity {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub space: String,
}

/// A solver's answer to the current problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub code: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub entrypoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<Complexity>,
    /// Round this submission answers.
    #[serde(default)]
    pub round: u32,
    /// Problem this submission answers.
    #[serde(default)]
    pub problem_id: String,
}

fn default_language() -> String {
    "python".to_string()
}

impl Submission {
    pub fn validate(&self) -> Result<(), String> {
        if self.code.trim().is_empty() {
            return Err("submission code is empty".into());
        }
        if self.language.trim().is_empty() {
            return Err("submission language is empty".into());
        }
        Ok(())
    }

    /// Bind the submission to the problem and round it answers.
    ///
    /// An empty entrypoint inherits the problem's.
    pub fn stamped(mut self, problem: &Problem) -> Self {
        self.round = problem.round;
        self.problem_id = problem.id.clone();
        if self.entrypoint.trim().is_empty() {
            self.entrypoint = problem.entrypoint.clone();
        }
        self
    }

    /// Whether this submission answers the given problem.
    pub fn answers(&self, problem: &Problem) -> bool {
        self.round == problem.round && self.problem_id == problem.id
    }
}
