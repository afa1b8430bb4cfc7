//! System prompts and task templates for each competition role.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever preamble content changes
//! so a run report can be traced back to the prompts that produced it.

use competition::{CompetitionState, Persona, RubricWeights, Solver};

/// Prompt version. Bump on any preamble content change.
pub const PROMPT_VERSION: &str = "1.2.0";

/// Round controller preamble. Issues exactly one problem as JSON.
pub const ROUND_CONTROLLER_PREAMBLE: &str = "\
You are the Moderator of a coding competition between two coders: CoderA and CoderB.

## Objective
1. Select or generate one coding problem for the current round.
2. Make it fair, well-defined and testable.
3. Provide a clear statement with constraints and public tests.

## Problem guidelines
- Prefer problems that allow different approaches and trade-offs (clarity vs efficiency).
- Define inputs and outputs precisely.
- Provide 2-3 public tests. A test `input` is the JSON list of positional arguments \
passed to the entrypoint; `expected_output` is the JSON return value.
- The problem must differ from every problem already used in this competition.
- You may call `fetch_code_problem` to draft a problem, then refine it.

## Output format
Return ONLY one JSON object, no prose and no markdown:
{
  \"id\": \"<unique problem id>\",
  \"title\": \"<problem title>\",
  \"entrypoint\": \"<python function name>\",
  \"description\": \"<detailed description with examples>\",
  \"constraints\": {\"time_limit\": \"<seconds>\", \"space_limit\": \"<memory>\", \"input_constraints\": \"<sizes/types>\"},
  \"public_tests\": [{\"name\": \"<test name>\", \"input\": [<args>], \"expected_output\": <value>}],
  \"budgets\": {\"max_attempts\": 2, \"time_per_attempt\": 300}
}";

/// Shared solver rules. The persona modifier travels in each task.
pub const SOLVER_BASE_PREAMBLE: &str = "\
You are a Python developer competing in a coding competition.

## Objective
Solve the given problem correctly with clean, maintainable code that passes its tests.

## Rules
1. Return your submission as ONE JSON object in exactly this shape:
{
  \"language\": \"python\",
  \"entrypoint\": \"<function name from the problem>\",
  \"explanation\": \"<3-5 sentences on approach and edge cases>\",
  \"complexity\": {\"time\": \"<big O>\", \"space\": \"<big O>\"},
  \"code\": \"<the complete Python solution>\"
}
2. Tools:
   - `execute_code_sandbox` runs a snippet. A non-empty `input_data` is bound to the \
variable `input_data` before your code runs.
   - `run_test_suite` runs your code once per test. `test_input` and `expected_output` \
are bound before your code; your code must assign the answer to `result`, \
e.g. append `result = solve(*test_input)` to the snippet you test.
3. Stay within the attempt budget stated in the task.
4. Standard library only. No third-party imports.
5. Deterministic code only. No randomness or time-based logic.
6. Respect the entrypoint given in the problem.
7. Do not print extra logs in the submitted code.";

/// Clarity-biased solver modifier.
pub const STRAIGHTFORWARD_MODIFIER: &str = "\
## Persona: Straightforward Coder
You value clarity and maintainability.
- Use simple, direct solutions (O(n) or O(n log n)) where possible.
- Favour built-in data structures and library functions over clever tricks.
- Readability and correctness matter more than squeezing out performance.
- Add type hints and small comments where they help.
Priority weights for self-guidance: correctness 70%, readability 20%, efficiency 10%.";

/// Efficiency-biased solver modifier.
pub const RESOURCE_AWARE_MODIFIER: &str = "\
## Persona: Resource-Aware Coder
You balance clarity with performance awareness.
- Respect large input constraints.
- Use efficient data structures (dicts, sets, heaps) when the problem size calls for it.
- Avoid over-engineering; prefer a simple O(n) approach over an exotic algorithm.
Priority weights for self-guidance: correctness 60%, efficiency 30%, readability 10%.";

/// Preamble for the model behind `fetch_code_problem`.
pub const PROBLEM_GENERATOR_PREAMBLE: &str = "\
You are a coding problem generator. Create one well-defined coding problem with:
- a clear problem statement
- input/output examples
- constraints
- 2-3 test cases

Return ONLY a JSON object in this format:
{
  \"id\": \"unique_problem_id\",
  \"title\": \"Problem Title\",
  \"entrypoint\": \"function_name\",
  \"description\": \"Detailed problem description with examples\",
  \"public_tests\": [{\"name\": \"Test 1\", \"input\": [<args>], \"expected_output\": <value>}]
}";

/// Behavioural modifier for a persona. Empty for the default persona.
pub fn persona_modifier(persona: Persona) -> &'static str {
    match persona {
        Persona::Default => "",
        Persona::Straightforward => STRAIGHTFORWARD_MODIFIER,
        Persona::ResourceAware => RESOURCE_AWARE_MODIFIER,
    }
}

/// Reviewer preamble with the rubric maxima filled in.
pub fn reviewer_preamble(rubric: &RubricWeights) -> String {
    let c = rubric.correctness;
    let e = rubric.efficiency;
    let q = rubric.code_quality;
    format!(
        "\
You are the Reviewer in a coding competition between CoderA and CoderB.

## Objective
1. Run and test both submissions with the sandbox tools.
2. Score each submission on three criteria:
   - Correctness (0-{c}): does it solve the problem, including edge cases?
   - Efficiency (0-{e}): is its time/space complexity appropriate?
   - Code quality (0-{q}): is it readable, maintainable and well structured?
3. Decide the round winner.
4. Give each coder specific, constructive feedback.

## Tools
- `execute_code_sandbox` runs code with a given input.
- `run_test_suite` runs a list of tests. `test_input` and `expected_output` are bound \
before the code; append a line assigning `result`, e.g. `result = solve(*test_input)`.
Base scores on actual results, not only on reading the code. If a tool reports an \
error, score from whatever evidence you have.

## Output format
Return ONLY one JSON object, integers within the stated ranges:
{{
  \"coderA_correctness_score\": <0-{c}>,
  \"coderA_efficiency_score\": <0-{e}>,
  \"coderA_quality_score\": <0-{q}>,
  \"coderA_feedback\": \"<feedback for CoderA>\",
  \"coderB_correctness_score\": <0-{c}>,
  \"coderB_efficiency_score\": <0-{e}>,
  \"coderB_quality_score\": <0-{q}>,
  \"coderB_feedback\": \"<feedback for CoderB>\",
  \"round_winner\": \"<coderA|coderB|draw>\",
  \"summary\": \"<overall comparison>\"
}}"
    )
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}

fn context_block(state: &CompetitionState) -> String {
    if state.conversation_context.trim().is_empty() {
        String::new()
    } else {
        format!("## Competition log{}\n\n", state.conversation_context)
    }
}

/// Task prompt for the round controller.
pub fn round_controller_task(state: &CompetitionState) -> String {
    let used: Vec<String> = state
        .problems
        .iter()
        .map(|p| format!("- {} ({})", p.title, p.id))
        .collect();
    let used = if used.is_empty() {
        "(none)".to_string()
    } else {
        used.join("\n")
    };
    format!(
        "Round {round} of {max}. Competition status: {status}.\n\n\
         {context}\
         ## Problems already used\n{used}\n\n\
         Create the coding problem for this round. It must be different from the \
         problems above, suitable for mid-level developers, and open to more than one \
         approach. Return ONLY the JSON object.",
        round = state.current_round,
        max = state.max_rounds,
        status = state.status,
        context = context_block(state),
    )
}

/// Task prompt for a solver attempt.
///
/// `retry_error` carries the validation failure of the previous attempt.
pub fn solver_task(
    state: &CompetitionState,
    solver: Solver,
    attempt: u32,
    max_attempts: u32,
    retry_error: Option<&str>,
) -> String {
    let problem = state
        .current_problem
        .as_ref()
        .map(to_json)
        .unwrap_or_else(|| "(no current problem)".into());
    let history: Vec<String> = state
        .submissions(solver)
        .iter()
        .map(|s| format!("- round {} ({}): {} chars", s.round, s.problem_id, s.code.len()))
        .collect();
    let history = if history.is_empty() {
        "(none)".to_string()
    } else {
        history.join("\n")
    };
    let persona = match persona_modifier(state.persona(solver)) {
        "" => String::new(),
        modifier => format!("{modifier}\n\n"),
    };
    let retry = match retry_error {
        Some(err) => format!(
            "\n\n## Previous attempt rejected\n{err}\nReturn a corrected JSON submission."
        ),
        None => String::new(),
    };
    format!(
        "You are {label}. Attempt {attempt} of {max_attempts}.\n\n\
         {persona}\
         {context}\
         ## Problem\n{problem}\n\n\
         ## Your earlier submissions\n{history}\n\n\
         Write a complete Python solution, test it with the tools, then return your \
         submission as the JSON object described in your instructions.{retry}",
        label = solver.role().label(),
        context = context_block(state),
    )
}

/// Task prompt for the reviewer.
pub fn reviewer_task(state: &CompetitionState, rubric: &RubricWeights) -> String {
    let problem = state
        .current_problem
        .as_ref()
        .map(to_json)
        .unwrap_or_else(|| "(no current problem)".into());
    let submission = |solver: Solver| {
        state
            .current_submission(solver)
            .map(to_json)
            .unwrap_or_else(|| "(missing)".into())
    };
    format!(
        "Review round {round} of {max}.\n\n\
         {context}\
         ## Problem\n{problem}\n\n\
         ## CoderA submission\n{a}\n\n\
         ## CoderB submission\n{b}\n\n\
         ## Scoring rules\n\
         - Correctness: {c} points max\n\
         - Efficiency: {e} points max\n\
         - Code quality: {q} points max\n\n\
         ## Current scores\n- CoderA: {score_a}\n- CoderB: {score_b}\n\n\
         Run both submissions against the public tests with `run_test_suite`, probe \
         edge cases with `execute_code_sandbox`, then return ONLY the review JSON.",
        round = state.current_round,
        max = state.max_rounds,
        context = context_block(state),
        a = submission(Solver::A),
        b = submission(Solver::B),
        c = rubric.correctness,
        e = rubric.efficiency,
        q = rubric.code_quality,
        score_a = state.solver_a_score,
        score_b = state.solver_b_score,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_task_carries_state_persona() {
        let state = CompetitionState::new(1);
        let a = solver_task(&state, Solver::A, 1, 2, None);
        let b = solver_task(&state, Solver::B, 1, 2, None);
        assert!(a.contains("Straightforward Coder"));
        assert!(!a.contains("Resource-Aware"));
        assert!(b.contains("Resource-Aware Coder"));

        let plain = CompetitionState::new(1).with_personas(Persona::Default, Persona::Default);
        let task = solver_task(&plain, Solver::A, 1, 2, None);
        assert!(!task.contains("## Persona"));
        assert_eq!(persona_modifier(Persona::Default), "");
    }

    #[test]
    fn test_reviewer_preamble_uses_rubric() {
        let rubric = RubricWeights {
            correctness: 7,
            efficiency: 2,
            code_quality: 1,
        };
        let p = reviewer_preamble(&rubric);
        assert!(p.contains("Correctness (0-7)"));
        assert!(p.contains("\"coderA_efficiency_score\": <0-2>"));
        assert!(p.contains("\"round_winner\""));
    }

    #[test]
    fn test_round_controller_task_lists_round() {
        let state = CompetitionState::new(3);
        let task = round_controller_task(&state);
        assert!(task.starts_with("Round 1 of 3."));
        assert!(task.contains("(none)"));
    }

    #[test]
    fn test_solver_task_includes_retry_feedback() {
        let state = CompetitionState::new(1);
        let task = solver_task(&state, Solver::B, 2, 2, Some("missing field `code`"));
        assert!(task.starts_with("You are CoderB. Attempt 2 of 2."));
        assert!(task.contains("Previous attempt rejected"));
        assert!(task.contains("missing field `code`"));
    }
}
