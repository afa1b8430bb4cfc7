//! JSON run report written at the end of a competition.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use competition::{
    CompetitionOutcome, CompetitionState, CompetitionStatus, MetricsSnapshot, Role, Termination,
    TurnRecord, Winner,
};
use serde::Serialize;

use crate::prompts::PROMPT_VERSION;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub prompt_version: String,
    pub generated_at: DateTime<Utc>,
    pub run_id: String,
    pub model: String,
    pub status: CompetitionStatus,
    pub termination: Termination,
    /// Human-readable summary lines, in print order.
    pub scoreboard: Vec<String>,
    pub agent_metrics: BTreeMap<Role, MetricsSnapshot>,
    pub turns: Vec<TurnRecord>,
    pub final_state: CompetitionState,
}

impl RunReport {
    pub fn new(
        outcome: CompetitionOutcome,
        agent_metrics: BTreeMap<Role, MetricsSnapshot>,
        model: &str,
    ) -> Self {
        let scoreboard = scoreboard(&outcome.state);
        Self {
            prompt_version: PROMPT_VERSION.to_string(),
            generated_at: Utc::now(),
            run_id: outcome.state.run_id.clone(),
            model: model.to_string(),
            status: outcome.state.status,
            termination: outcome.termination,
            scoreboard,
            agent_metrics,
            turns: outcome.turns,
            final_state: outcome.state,
        }
    }

    pub fn failed(&self) -> bool {
        self.status == CompetitionStatus::Error
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize run report")
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write report to {}", path.display()))
    }
}

/// Final scores, result, round summaries and run metrics.
pub fn scoreboard(state: &CompetitionState) -> Vec<String> {
    let mut lines = vec![
        format!("CoderA: {} points", state.solver_a_score),
        format!("CoderB: {} points", state.solver_b_score),
    ];
    lines.push(match (state.status, state.overall_winner) {
        (CompetitionStatus::Error, _) => format!(
            "Competition ended in error: {}",
            state.error_log.last().map_or("(no error recorded)", String::as_str)
        ),
        (_, Some(Winner::SolverA)) => "Winner: CoderA".to_string(),
        (_, Some(Winner::SolverB)) => "Winner: CoderB".to_string(),
        (_, Some(Winner::Draw)) => "Result: Draw".to_string(),
        (status, None) => format!("No winner (status {status})"),
    });
    lines.extend(
        state
            .reviewer_comments
            .iter()
            .enumerate()
            .map(|(i, comment)| format!("Round {}: {comment}", i + 1)),
    );
    lines.push(format!("API calls: {}", state.metrics.api_calls_made));
    lines.push(format!("Total tokens: {}", state.metrics.total_tokens));
    if let Some(secs) = state.metrics.total_duration_secs {
        lines.push(format!("Duration: {secs:.2}s"));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoreboard_for_completed_run() {
        let mut state = CompetitionState::new(1);
        state.solver_a_score = 10;
        state.solver_b_score = 3;
        state.overall_winner = Some(Winner::SolverA);
        state.status = CompetitionStatus::Completed;
        state
            .reviewer_comments
            .push("Round 1 - SolverA: 10 points (clean), SolverB: 3 points (slow)".into());
        state.metrics.total_duration_secs = Some(1.5);

        let lines = scoreboard(&state);
        assert_eq!(lines[0], "CoderA: 10 points");
        assert_eq!(lines[2], "Winner: CoderA");
        assert!(lines[3].starts_with("Round 1: Round 1 - SolverA"));
        assert_eq!(lines.last().map(String::as_str), Some("Duration: 1.50s"));
    }

    #[test]
    fn test_scoreboard_reports_last_error() {
        let mut state = CompetitionState::new(2);
        state.fail("CoderB Error: output validation failed: no JSON object found");
        let lines = scoreboard(&state);
        assert_eq!(
            lines[2],
            "Competition ended in error: CoderB Error: output validation failed: no JSON object found"
        );
    }

    #[test]
    fn test_report_json_uses_role_tokens() {
        let state = CompetitionState::new(1);
        let outcome = CompetitionOutcome {
            state,
            termination: Termination::Completed,
            turns: vec![],
        };
        let metrics = BTreeMap::from([(
            Role::SolverA,
            MetricsSnapshot {
                calls: 1,
                errors: 0,
                success_rate: 1.0,
                average_execution_time: 0.5,
                tool_calls: 2,
            },
        )]);
        let report = RunReport::new(outcome, metrics, "gpt-4o-mini");
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["agent_metrics"]["coderA"]["tool_calls"], 2);
        assert_eq!(value["termination"], "completed");
        assert_eq!(value["prompt_version"], PROMPT_VERSION);
        assert!(!report.failed());
    }
}
