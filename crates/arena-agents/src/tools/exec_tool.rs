//! Snippet execution tool.

use std::sync::Arc;

use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;

use super::ToolError;
use crate::sandbox::Sandbox;

#[derive(Deserialize)]
pub struct ExecuteCodeArgs {
    /// Python source to run.
    pub code: String,
    /// Bound to `input_data` before the code when non-empty.
    #[serde(default)]
    pub input_data: String,
}

/// Run a Python snippet in a fresh sandbox process.
pub struct ExecuteCodeTool {
    sandbox: Arc<Sandbox>,
}

impl ExecuteCodeTool {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }
}

impl Tool for ExecuteCodeTool {
    const NAME: &'static str = "execute_code_sandbox";
    type Error = ToolError;
    type Args = ExecuteCodeArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Execute Python code in a fresh sandbox and return stdout, stderr \
                          or the error traceback. A non-empty input_data string is bound to \
                          the variable `input_data` before the code runs."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "code": {
                        "type": "string",
                        "description": "Python code to execute"
                    },
                    "input_data": {
                        "type": "string",
                        "description": "Optional input bound to `input_data`"
                    }
                },
                "required": ["code"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        if args.code.trim().is_empty() {
            return Err(ToolError::InvalidArgs("code is empty".into()));
        }
        Ok(self.sandbox.execute(&args.code, &args.input_data).await)
    }
}
