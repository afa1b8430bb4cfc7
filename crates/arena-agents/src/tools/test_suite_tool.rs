//! Test-suite tool: runs a submission once per test case.

use std::sync::Arc;

use competition::CodeTest;
use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;

use super::ToolError;
use crate::sandbox::Sandbox;

#[derive(Deserialize)]
pub struct RunTestSuiteArgs {
    /// Code under test. Must assign `result`.
    pub code: String,
    #[serde(default)]
    pub test_cases: Vec<CodeTest>,
}

pub struct RunTestSuiteTool {
    sandbox: Arc<Sandbox>,
}

impl RunTestSuiteTool {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }
}

impl Tool for RunTestSuiteTool {
    const NAME: &'static str = "run_test_suite";
    type Error = ToolError;
    type Args = RunTestSuiteArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Run code against a list of test cases, one fresh process per test. \
                          `test_input` and `expected_output` are bound before the code; the \
                          code must assign its answer to `result`. Returns pass/fail per test \
                          and a pass rate."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "code": {
                        "type": "string",
                        "description": "Python code that assigns `result`, e.g. ending in `result = solve(*test_input)`"
                    },
                    "test_cases": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "name": { "type": "string" },
                                "input": { "description": "JSON value bound to `test_input`" },
                                "expected_output": { "description": "JSON value compared with str(result)" }
                            },
                            "required": ["input", "expected_output"]
                        }
                    }
                },
                "required": ["code", "test_cases"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        if args.code.trim().is_empty() {
            return Err(ToolError::InvalidArgs("code is empty".into()));
        }
        Ok(self.sandbox.run_tests(&args.code, &args.test_cases).await)
    }
}
