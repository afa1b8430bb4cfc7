//! Local Python sandbox behind the code tools.
//!
//! Every run gets a fresh temporary directory and interpreter process, killed
//! on timeout. Results are rendered as plain-text reports for the model; only
//! failures to start the interpreter surface as [`SandboxError`], and the
//! public entry points render those as reports too.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use competition::CodeTest;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, warn};

/// Output kept per stream before truncation.
const MAX_STREAM_CHARS: usize = 8_000;

const RULE: &str = "============================================================";

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("failed to prepare script directory: {0}")]
    Workspace(std::io::Error),

    #[error("failed to start `{interpreter}`: {source}")]
    Spawn {
        interpreter: String,
        source: std::io::Error,
    },

    #[error("execution timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

/// Captured result of one interpreter run.
#[derive(Debug, Clone)]
pub struct ScriptRun {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ScriptRun {
    /// Last non-empty stderr line, usually `ExcType: message`.
    pub fn error_line(&self) -> &str {
        self.stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("[no error output]")
    }
}

/// Python interpreter runner.
#[derive(Debug, Clone)]
pub struct Sandbox {
    interpreter: String,
    timeout: Duration,
}

/// Render a JSON value as a Python literal.
pub fn py_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => Value::String(s.clone()).to_string(),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(py_literal).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", Value::String(k.clone()), py_literal(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

/// Human-readable rendering used in reports (strings unquoted).
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(s: &str) -> String {
    match s.char_indices().nth(MAX_STREAM_CHARS) {
        Some((idx, _)) => format!("{}\n[... truncated]", &s[..idx]),
        None => s.to_string(),
    }
}

fn or_placeholder(s: &str, placeholder: &str) -> String {
    if s.trim().is_empty() {
        placeholder.to_string()
    } else {
        truncate(s.trim_end())
    }
}

/// Script for one test case. The submission must assign `result`.
fn test_script(code: &str, test: &CodeTest) -> String {
    format!(
        "# Test Case: {name}\n\
         test_input = {input}\n\
         expected_output = {expected}\n\
         \n\
         {code}\n\
         \n\
         try:\n    \
             actual_output = str(result) if 'result' in locals() else '[No result variable]'\n    \
             test_passed = actual_output.strip() == str(expected_output).strip()\n    \
             print(f\"ACTUAL: {{actual_output}}\")\n    \
             print(f\"EXPECTED: {{expected_output}}\")\n    \
             print(f\"PASSED: {{test_passed}}\")\n\
         except Exception as e:\n    \
             print(f\"ERROR: {{e}}\")\n    \
             print(\"PASSED: False\")\n",
        name = test.name.replace('\n', " "),
        input = py_literal(&test.input),
        expected = py_literal(&test.expected_output),
    )
}

/// The `ACTUAL:` value printed by a test script, if any.
fn actual_output(stdout: &str) -> Option<&str> {
    let rest = stdout.split("ACTUAL: ").nth(1)?;
    Some(rest.split("EXPECTED:").next().unwrap_or(rest).trim())
}

enum TestOutcome {
    Passed { output: String },
    Failed { output: String },
    RuntimeError { error: String },
}

impl Sandbox {
    pub fn new(interpreter: impl Into<String>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
        }
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Run one script to completion in a fresh directory.
    pub async fn run_script(&self, script: &str) -> Result<ScriptRun, SandboxError> {
        let dir = tempfile::tempdir().map_err(SandboxError::Workspace)?;
        let path: PathBuf = dir.path().join("main.py");
        tokio::fs::write(&path, script)
            .await
            .map_err(SandboxError::Workspace)?;

        let child = Command::new(&self.interpreter)
            .arg(&path)
            .current_dir(dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SandboxError::Spawn {
                interpreter: self.interpreter.clone(),
                source,
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(SandboxError::Spawn {
                    interpreter: self.interpreter.clone(),
                    source,
                });
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Sandbox script timed out");
                return Err(SandboxError::Timeout {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let run = ScriptRun {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(
            success = run.success,
            exit_code = ?run.exit_code,
            stdout_len = run.stdout.len(),
            stderr_len = run.stderr.len(),
            "Sandbox script finished"
        );
        Ok(run)
    }

    /// Execute a snippet, binding a non-empty `input_data` first.
    pub async fn execute(&self, code: &str, input_data: &str) -> String {
        let full_code = if input_data.is_empty() {
            code.to_string()
        } else {
            format!(
                "# Input data\ninput_data = {}\n\n# User code\n{code}\n",
                py_literal(&Value::String(input_data.to_string()))
            )
        };

        match self.run_script(&full_code).await {
            Ok(run) if run.success => format!(
                "EXECUTION SUCCESS\n\n\
                 Output:\n{}\n\n\
                 Logs:\n{}\n\n\
                 Execution completed successfully.\n",
                or_placeholder(&run.stdout, "[No output]"),
                or_placeholder(&run.stderr, "[No stderr]"),
            ),
            Ok(run) => format!(
                "EXECUTION ERROR\n\n\
                 Error Type: Runtime Error\n\
                 Error Message: {}\n\
                 Exit Code: {}\n\
                 Traceback:\n{}\n\n\
                 Code executed:\n{}\n",
                run.error_line(),
                run.exit_code.map_or_else(|| "killed".to_string(), |c| c.to_string()),
                or_placeholder(&run.stderr, "[No traceback]"),
                truncate(&full_code),
            ),
            Err(e) => format!(
                "SANDBOX ERROR\n\n\
                 Error: Failed to execute code\n\
                 Details: {e}\n\n\
                 Check that `{}` is installed and the code terminates within {}s.\n",
                self.interpreter,
                self.timeout.as_secs(),
            ),
        }
    }

    async fn run_test(&self, code: &str, test: &CodeTest) -> Result<TestOutcome, SandboxError> {
        let run = match self.run_script(&test_script(code, test)).await {
            Ok(run) => run,
            Err(SandboxError::Timeout { seconds }) => {
                return Ok(TestOutcome::RuntimeError {
                    error: format!("TimeoutError: no result after {seconds}s"),
                });
            }
            Err(e) => return Err(e),
        };

        if !run.success {
            return Ok(TestOutcome::RuntimeError {
                error: run.error_line().to_string(),
            });
        }
        if run.stdout.contains("PASSED: True") {
            Ok(TestOutcome::Passed {
                output: actual_output(&run.stdout).unwrap_or("[Unknown]").to_string(),
            })
        } else {
            Ok(TestOutcome::Failed {
                output: actual_output(&run.stdout)
                    .map(str::to_string)
                    .unwrap_or_else(|| truncate(run.stdout.trim())),
            })
        }
    }

    /// Run `code` once per test case and render the suite report.
    pub async fn run_tests(&self, code: &str, tests: &[CodeTest]) -> String {
        if tests.is_empty() {
            return "NO TESTS PROVIDED\n\nNo test cases were provided to run.".to_string();
        }

        let mut details = String::new();
        let mut passed = 0usize;
        for (i, test) in tests.iter().enumerate() {
            let n = i + 1;
            let name = if test.name.trim().is_empty() {
                format!("Test {n}")
            } else {
                test.name.clone()
            };
            let input = display_value(&test.input);
            let expected = display_value(&test.expected_output);

            let outcome = match self.run_test(code, test).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    return format!(
                        "TEST SUITE ERROR\n\n\
                         Error: Failed to run test suite\n\
                         Details: {e}\n\n\
                         Test cases provided: {}\n",
                        tests.len()
                    );
                }
            };

            let (status, last_line) = match outcome {
                TestOutcome::Passed { output } => {
                    passed += 1;
                    ("PASSED", format!("Output: {output}"))
                }
                TestOutcome::Failed { output } => ("FAILED", format!("Output: {output}")),
                TestOutcome::RuntimeError { error } => {
                    ("FAILED (Runtime Error)", format!("Error: {error}"))
                }
            };
            details.push_str(&format!(
                "\nTest {n}: {name}\n  Status: {status}\n  Input: {input}\n  Expected: {expected}\n  {last_line}\n"
            ));
        }

        let total = tests.len();
        let failed = total - passed;
        let pass_rate = passed as f64 / total as f64 * 100.0;
        let verdict = if failed == 0 {
            "ALL TESTS PASSED".to_string()
        } else {
            format!("{failed} TEST(S) FAILED")
        };

        format!(
            "{RULE}\nTEST SUITE RESULTS\n{RULE}\n\n\
             Total Tests: {total}\n\
             Passed: {passed}\n\
             Failed: {failed}\n\
             Pass Rate: {pass_rate:.1}%\n\n\
             {RULE}\nDETAILED RESULTS\n{RULE}\n\
             {details}\n\
             {RULE}\nSUMMARY: {verdict}\n{RULE}\n"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_py_literal() {
        assert_eq!(py_literal(&json!(null)), "None");
        assert_eq!(py_literal(&json!([1, true, "a\"b"])), "[1, True, \"a\\\"b\"]");
        assert_eq!(py_literal(&json!({"k": false})), "{\"k\": False}");
        assert_eq!(py_literal(&json!(2.5)), "2.5");
    }

    #[test]
    fn test_script_binds_inputs_before_code() {
        let test = CodeTest {
            name: "basic".into(),
            input: json!([[2, 7, 11], 9]),
            expected_output: json!([0, 1]),
        };
        let script = test_script("result = solve(*test_input)", &test);
        let bind = script.find("test_input = [[2, 7, 11], 9]").unwrap();
        let user = script.find("result = solve(*test_input)").unwrap();
        assert!(bind < user);
        assert!(script.contains("expected_output = [0, 1]"));
        assert!(script.contains("    actual_output = str(result)"));
        assert!(script.contains("print(f\"PASSED: {test_passed}\")"));
    }

    #[test]
    fn test_actual_output_extraction() {
        assert_eq!(
            actual_output("ACTUAL: [0, 1]\nEXPECTED: [0, 1]\nPASSED: True\n"),
            Some("[0, 1]")
        );
        assert_eq!(actual_output("nothing here"), None);
    }

    #[test]
    fn test_error_line() {
        let run = ScriptRun {
            success: false,
            exit_code: Some(1),
            stdout: String::new(),
            stderr: "Traceback (most recent call last):\n  File \"main.py\"\nZeroDivisionError: division by zero\n\n".into(),
        };
        assert_eq!(run.error_line(), "ZeroDivisionError: division by zero");
    }

    #[tokio::test]
    async fn test_empty_suite_short_circuits() {
        let sandbox = Sandbox::new("definitely-not-a-python", Duration::from_secs(1));
        let report = sandbox.run_tests("result = 1", &[]).await;
        assert!(report.starts_with("NO TESTS PROVIDED"));
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_reported() {
        let sandbox = Sandbox::new("definitely-not-a-python", Duration::from_secs(1));
        let report = sandbox.execute("print(1)", "").await;
        assert!(report.starts_with("SANDBOX ERROR"));
        assert!(report.contains("definitely-not-a-python"));

        let tests = [CodeTest {
            name: "t".into(),
            input: json!([]),
            expected_output: json!(1),
        }];
        let report = sandbox.run_tests("result = 1", &tests).await;
        assert!(report.starts_with("TEST SUITE ERROR"));
        assert!(report.contains("Test cases provided: 1"));
    }
}
