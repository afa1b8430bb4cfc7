//! Scripted competition runs: exercises controller ↔ router ↔ executor ↔
//! scoring together with deterministic agents (no model calls).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use competition::{
    fold_review, route, Agent, AgentError, Competition, CompetitionConfig, CompetitionState,
    CompetitionStatus, Problem, RawReview, Role, Roster, Route, RubricWeights, SetupError,
    Solver, Submission, Termination, TurnOutput, Usage, Winner,
};

type TestResult = Result<(), Box<dyn std::error::Error>>;

// ── Scripted agents ─────────────────────────────────────────────────

struct ScriptedController {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Agent for ScriptedController {
    fn role(&self) -> Role {
        Role::RoundController
    }

    async fn act(&self, state: &CompetitionState) -> Result<TurnOutput, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut next = state.clone();
        let problem: Problem = serde_json::from_value(serde_json::json!({
            "id": "sum-pair",
            "title": format!("Sum pair {}", state.current_round),
            "entrypoint": "solve",
            "description": "Return the sum of two integers.",
            "public_tests": [{"name": "small", "input": [1, 2], "expected_output": 3}],
            "budgets": {"max_attempts": 2}
        }))
        .map_err(|e| AgentError::validation(e.to_string()))?;
        let title = next.issue_problem(problem)?.title.clone();
        let round = next.current_round;
        next.note(
            Role::RoundController,
            &format!("Selected problem '{title}' for round {round}"),
        );
        Ok(TurnOutput::new(next).with_usage(Usage {
            model_calls: 1,
            tool_calls: 1,
            tokens: 100,
        }))
    }
}

struct ScriptedSolver {
    solver: Solver,
    fail_on_round: Option<u32>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Agent for ScriptedSolver {
    fn role(&self) -> Role {
        self.solver.role()
    }

    async fn act(&self, state: &CompetitionState) -> Result<TurnOutput, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_round == Some(state.current_round) {
            return Err(AgentError::validation("missing field `code`"));
        }
        let mut next = state.clone();
        let submission: Submission = serde_json::from_value(serde_json::json!({
            "code": "def solve(a, b):\n    return a + b\n",
            "language": "python",
            "explanation": format!("{} solution", self.solver),
        }))
        .map_err(|e| AgentError::validation(e.to_string()))?;
        next.record_submission(self.solver, submission)?;
        next.note(self.solver.role(), "Submitted code with entrypoint solve");
        Ok(TurnOutput::new(next))
    }
}

/// Scores per round: (solver A [c, e, q], solver B [c, e, q], winner).
type RoundScores = ([i64; 3], [i64; 3], Winner);

struct ScriptedReviewer {
    scores: Vec<RoundScores>,
    rubric: RubricWeights,
    calls: Arc<AtomicUsize>,
    totals_seen: Arc<Mutex<Vec<(u32, u32)>>>,
}

#[async_trait]
impl Agent for ScriptedReviewer {
    fn role(&self) -> Role {
        Role::Reviewer
    }

    async fn act(&self, state: &CompetitionState) -> Result<TurnOutput, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (a, b, winner) = self
            .scores
            .get(state.current_round as usize - 1)
            .copied()
            .ok_or_else(|| AgentError::MissingInput("no scripted scores".into()))?;
        let raw = RawReview {
            solver_a_correctness: a[0],
            solver_a_efficiency: a[1],
            solver_a_code_quality: a[2],
            solver_a_feedback: "readable".into(),
            solver_b_correctness: b[0],
            solver_b_efficiency: b[1],
            solver_b_code_quality: b[2],
            solver_b_feedback: "fast".into(),
            round_winner: winner,
            summary: "scripted".into(),
        };
        let review = raw.validate(&self.rubric)?;
        let mut next = state.clone();
        fold_review(&mut next, &review)?;
        if let Ok(mut seen) = self.totals_seen.lock() {
            seen.push((next.solver_a_score, next.solver_b_score));
        }
        Ok(TurnOutput::new(next))
    }
}

/// Reviewer that forgets to hand the turn on.
struct SilentReviewer;

#[async_trait]
impl Agent for SilentReviewer {
    fn role(&self) -> Role {
        Role::Reviewer
    }

    async fn act(&self, state: &CompetitionState) -> Result<TurnOutput, AgentError> {
        let mut next = state.clone();
        next.next_agent = None;
        Ok(TurnOutput::new(next))
    }
}

/// Hands the turn straight back to the round controller without progress.
struct LoopingAgent {
    role: Role,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Agent for LoopingAgent {
    fn role(&self) -> Role {
        self.role
    }

    async fn act(&self, state: &CompetitionState) -> Result<TurnOutput, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut next = state.clone();
        next.next_agent = Some(Role::RoundController);
        Ok(TurnOutput::new(next))
    }
}

fn looping_roster(calls: &Arc<AtomicUsize>) -> Roster {
    let agent = |role| -> Box<dyn Agent> {
        Box::new(LoopingAgent {
            role,
            calls: calls.clone(),
        })
    };
    Roster {
        round_controller: agent(Role::RoundController),
        solver_a: agent(Role::SolverA),
        solver_b: agent(Role::SolverB),
        reviewer: agent(Role::Reviewer),
    }
}

// ── Harness ─────────────────────────────────────────────────────────

#[derive(Default)]
struct Counters {
    controller: Arc<AtomicUsize>,
    solver_a: Arc<AtomicUsize>,
    solver_b: Arc<AtomicUsize>,
    reviewer: Arc<AtomicUsize>,
    totals_seen: Arc<Mutex<Vec<(u32, u32)>>>,
}

fn roster(counters: &Counters, scores: Vec<RoundScores>, fail_b_on: Option<u32>) -> Roster {
    Roster {
        round_controller: Box::new(ScriptedController {
            calls: counters.controller.clone(),
        }),
        solver_a: Box::new(ScriptedSolver {
            solver: Solver::A,
            fail_on_round: None,
            calls: counters.solver_a.clone(),
        }),
        solver_b: Box::new(ScriptedSolver {
            solver: Solver::B,
            fail_on_round: fail_b_on,
            calls: counters.solver_b.clone(),
        }),
        reviewer: Box::new(ScriptedReviewer {
            scores,
            rubric: RubricWeights::default(),
            calls: counters.reviewer.clone(),
            totals_seen: counters.totals_seen.clone(),
        }),
    }
}

fn config(max_rounds: u32) -> CompetitionConfig {
    CompetitionConfig {
        max_rounds,
        ..CompetitionConfig::default()
    }
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_single_round_clear_winner() -> TestResult {
    let counters = Counters::default();
    let scores = vec![([5, 3, 2], [2, 1, 0], Winner::SolverA)];
    let mut comp = Competition::new(config(1), roster(&counters, scores, None))?;

    let outcome = comp.run().await;
    let state = &outcome.state;

    assert_eq!(outcome.termination, Termination::Completed);
    assert_eq!(state.solver_a_score, 10);
    assert_eq!(state.solver_b_score, 3);
    assert_eq!(state.round_winner, Some(Winner::SolverA));
    assert_eq!(state.overall_winner, Some(Winner::SolverA));
    assert_eq!(state.status, CompetitionStatus::Completed);
    assert_eq!(state.next_agent, None);
    assert!(state.error_log.is_empty());
    assert_eq!(
        state.reviewer_comments,
        vec!["Round 1 - SolverA: 10 points (readable), SolverB: 3 points (fast)"]
    );

    let roles: Vec<Role> = outcome.turns.iter().map(|t| t.role).collect();
    assert_eq!(roles, Role::ALL.to_vec());
    assert!(state.metrics.finished_at.is_some());
    assert_eq!(state.metrics.api_calls_made, 1);
    assert_eq!(state.metrics.total_tokens, 100);
    Ok(())
}

#[tokio::test]
async fn test_two_rounds_equal_totals_is_draw() -> TestResult {
    let counters = Counters::default();
    let scores = vec![
        ([3, 1, 1], [1, 1, 0], Winner::SolverA),
        ([1, 1, 0], [3, 1, 1], Winner::SolverB),
    ];
    let mut comp = Competition::new(config(2), roster(&counters, scores, None))?;

    let outcome = comp.run().await;
    assert_eq!(outcome.state.solver_a_score, 7);
    assert_eq!(outcome.state.solver_b_score, 7);
    assert_eq!(outcome.state.round_winner, Some(Winner::SolverB));
    assert_eq!(outcome.state.overall_winner, Some(Winner::Draw));
    assert_eq!(outcome.state.status, CompetitionStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn test_n_rounds_complete_with_matching_ledgers() -> TestResult {
    let counters = Counters::default();
    let scores = vec![
        ([4, 2, 1], [5, 2, 2], Winner::SolverB),
        ([5, 3, 2], [3, 3, 2], Winner::SolverA),
        ([2, 2, 2], [2, 2, 1], Winner::SolverA),
    ];
    let mut comp = Competition::new(config(3), roster(&counters, scores, None))?;
    let outcome = comp.run().await;
    let state = &outcome.state;

    assert_eq!(state.status, CompetitionStatus::Completed);
    assert_eq!(counters.reviewer.load(Ordering::SeqCst), 3);
    assert_eq!(state.reviewer_comments.len(), 3);
    assert_eq!(outcome.turns.len(), 12);
    assert_eq!(state.current_round, 3);

    // one problem and one submission per solver per round, stamped alike
    assert_eq!(state.problems.len(), 3);
    for (i, problem) in state.problems.iter().enumerate() {
        let round = i as u32 + 1;
        assert_eq!(problem.round, round);
        for solver in [Solver::A, Solver::B] {
            let subs: Vec<_> = state
                .submissions(solver)
                .iter()
                .filter(|s| s.round == round)
                .collect();
            assert_eq!(subs.len(), 1);
            assert_eq!(subs[0].problem_id, problem.id);
        }
    }

    // problem ids stay unique even though the controller reuses one
    assert_eq!(state.problems[0].id, "sum-pair");
    assert_eq!(state.problems[1].id, "sum-pair-r2");
    assert_eq!(state.problems[2].id, "sum-pair-r3");

    assert_eq!(state.solver_a_score, 23);
    assert_eq!(state.solver_b_score, 22);
    assert_eq!(state.overall_winner, Some(Winner::SolverA));
    Ok(())
}

#[tokio::test]
async fn test_scores_never_decrease_across_rounds() -> TestResult {
    let counters = Counters::default();
    let scores = vec![
        ([0, 0, 0], [5, 3, 2], Winner::SolverB),
        ([1, 0, 0], [0, 0, 0], Winner::SolverA),
        ([5, 3, 2], [0, 1, 0], Winner::SolverA),
        ([0, 0, 0], [0, 0, 0], Winner::Draw),
    ];
    let mut comp = Competition::new(config(4), roster(&counters, scores, None))?;
    comp.run().await;

    let seen = counters.totals_seen.lock().map_err(|e| e.to_string())?.clone();
    assert_eq!(seen.len(), 4);
    for pair in seen.windows(2) {
        assert!(pair[1].0 >= pair[0].0);
        assert!(pair[1].1 >= pair[0].1);
    }
    Ok(())
}

#[tokio::test]
async fn test_invalid_submission_short_circuits_run() -> TestResult {
    let counters = Counters::default();
    let scores = vec![([5, 3, 2], [2, 1, 0], Winner::SolverA); 2];
    let mut comp = Competition::new(config(2), roster(&counters, scores, Some(1)))?;

    let outcome = comp.run().await;
    let state = &outcome.state;

    assert_eq!(outcome.termination, Termination::Failed);
    assert_eq!(state.status, CompetitionStatus::Error);
    assert_eq!(state.error_log.len(), 1);
    assert!(state.error_log[0].starts_with("CoderB Error:"));
    assert_eq!(counters.reviewer.load(Ordering::SeqCst), 0);
    assert_eq!(outcome.turns.len(), 3);
    assert!(!outcome.turns[2].succeeded);

    // partial results survive
    assert_eq!(state.problems.len(), 1);
    assert_eq!(state.solver_a_submissions.len(), 1);

    // terminal regardless of what next agent says
    let mut probe = state.clone();
    for role in Role::ALL {
        probe.next_agent = Some(role);
        assert_eq!(route(&probe), Route::End(Termination::Failed));
    }

    let metrics = comp.agent_metrics();
    assert_eq!(metrics[&Role::SolverB].calls, 1);
    assert_eq!(metrics[&Role::SolverB].errors, 1);
    assert_eq!(metrics[&Role::SolverB].success_rate, 0.0);
    assert_eq!(metrics[&Role::Reviewer].calls, 0);
    assert_eq!(metrics[&Role::RoundController].tool_calls, 1);
    Ok(())
}

#[tokio::test]
async fn test_out_of_range_review_rejected_before_folding() -> TestResult {
    let counters = Counters::default();
    let scores = vec![([6, 3, 2], [2, 1, 0], Winner::SolverA)];
    let mut comp = Competition::new(config(1), roster(&counters, scores, None))?;

    let outcome = comp.run().await;
    assert_eq!(outcome.state.status, CompetitionStatus::Error);
    assert_eq!(outcome.state.solver_a_score, 0);
    assert_eq!(outcome.state.solver_b_score, 0);
    assert!(outcome.state.reviewer_comments.is_empty());
    assert_eq!(outcome.state.error_log.len(), 1);
    assert!(outcome.state.error_log[0].contains("outside 0..=5"));
    Ok(())
}

#[tokio::test]
async fn test_missing_next_agent_is_recorded_as_stall() -> TestResult {
    let counters = Counters::default();
    let mut roster = roster(&counters, vec![], None);
    roster.reviewer = Box::new(SilentReviewer);
    let mut comp = Competition::new(config(1), roster)?;

    let outcome = comp.run().await;
    assert_eq!(outcome.termination, Termination::Stalled);
    assert_eq!(outcome.state.status, CompetitionStatus::Error);
    assert_eq!(outcome.state.error_log.len(), 1);
    assert!(outcome.state.error_log[0].contains("stalled"));
    assert_eq!(outcome.state.overall_winner, None);
    Ok(())
}

#[tokio::test]
async fn test_turn_budget_stops_a_run_that_never_advances() -> TestResult {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut comp = Competition::new(config(1), looping_roster(&calls))?;

    let outcome = comp.run().await;
    assert_eq!(outcome.termination, Termination::Failed);
    assert_eq!(outcome.turns.len(), 4);
    assert!(outcome.turns.iter().all(|t| t.role == Role::RoundController));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(outcome.state.status, CompetitionStatus::Error);
    assert_eq!(
        outcome.state.error_log,
        vec!["Controller Error: turn budget of 4 exhausted"]
    );
    assert_eq!(comp.agent_metrics()[&Role::RoundController].calls, 4);
    Ok(())
}

#[tokio::test]
async fn test_snapshot_round_outside_range_fails_before_any_turn() -> TestResult {
    for (round, expected) in [
        (0, "Controller Error: round 0 outside 1..=2"),
        (3, "Controller Error: round 3 outside 1..=2"),
    ] {
        let counters = Counters::default();
        let mut comp = Competition::new(config(2), roster(&counters, vec![], None))?;
        let mut snapshot = comp.initial_state();
        snapshot.current_round = round;

        let outcome = comp.run_from(snapshot).await;
        assert_eq!(outcome.termination, Termination::Failed);
        assert!(outcome.turns.is_empty());
        assert_eq!(outcome.state.status, CompetitionStatus::Error);
        assert_eq!(outcome.state.error_log, vec![expected]);
        assert_eq!(counters.controller.load(Ordering::SeqCst), 0);
    }
    Ok(())
}

#[tokio::test]
async fn test_run_from_resumes_final_round() -> TestResult {
    let counters = Counters::default();
    let scores = vec![
        ([0, 0, 0], [0, 0, 0], Winner::Draw),
        ([1, 1, 1], [0, 0, 0], Winner::SolverA),
    ];
    let mut comp = Competition::new(config(2), roster(&counters, scores, None))?;

    let mut snapshot = comp.initial_state();
    snapshot.current_round = 2;
    snapshot.solver_b_score = 4;
    let run_id = snapshot.run_id.clone();

    let outcome = comp.run_from(snapshot).await;
    assert_eq!(outcome.state.run_id, run_id);
    assert_eq!(outcome.turns.len(), 4);
    assert_eq!(outcome.state.solver_a_score, 3);
    assert_eq!(outcome.state.solver_b_score, 4);
    assert_eq!(outcome.state.overall_winner, Some(Winner::SolverB));
    assert_eq!(counters.controller.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_terminal_snapshot_runs_no_turns() -> TestResult {
    let counters = Counters::default();
    let mut comp = Competition::new(config(1), roster(&counters, vec![], None))?;

    let mut snapshot = comp.initial_state();
    snapshot.fail("earlier failure");
    let outcome = comp.run_from(snapshot).await;

    assert!(outcome.turns.is_empty());
    assert_eq!(outcome.state.error_log, vec!["earlier failure"]);
    assert_eq!(counters.controller.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn test_roster_slot_mismatch_rejected() {
    let counters = Counters::default();
    let mut roster = roster(&counters, vec![], None);
    roster.solver_a = Box::new(ScriptedSolver {
        solver: Solver::B,
        fail_on_round: None,
        calls: counters.solver_a.clone(),
    });
    let err = Competition::new(config(1), roster).err();
    assert!(matches!(
        err,
        Some(SetupError::RoleMismatch {
            slot: Role::SolverA,
            found: Role::SolverB
        })
    ));
}

#[test]
fn test_invalid_config_rejected() {
    let counters = Counters::default();
    let err = Competition::new(config(0), roster(&counters, vec![], None)).err();
    assert!(matches!(err, Some(SetupError::Config(_))));
}
