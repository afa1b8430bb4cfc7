//! Problem drafting tool for the round controller.
//!
//! Delegates to a separate model preambled as a problem generator. A failed
//! generation comes back as a JSON error object rather than a tool error.

use std::sync::Arc;

use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;
use tracing::warn;

use super::ToolError;
use crate::model::ModelCall;

#[derive(Deserialize)]
pub struct FetchProblemArgs {
    /// Topic or requirements for the problem.
    pub prompt: String,
}

pub struct FetchProblemTool {
    generator: Arc<dyn ModelCall>,
}

impl FetchProblemTool {
    pub fn new(generator: Arc<dyn ModelCall>) -> Self {
        Self { generator }
    }

    /// Draft a problem, rendering failure as `{"error", "prompt"}` JSON.
    pub async fn generate(&self, prompt: &str) -> String {
        match self
            .generator
            .complete(&format!("Generate a coding problem: {prompt}"))
            .await
        {
            Ok(reply) => reply.text,
            Err(e) => {
                warn!(error = %e, "Problem generation failed");
                let body = serde_json::json!({
                    "error": format!("Failed to generate problem: {e}"),
                    "prompt": prompt,
                });
                serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string())
            }
        }
    }
}

impl Tool for FetchProblemTool {
    const NAME: &'static str = "fetch_code_problem";
    type Error = ToolError;
    type Args = FetchProblemArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Draft a coding problem (statement, entrypoint, public tests) as JSON \
                          from a short description of the topic and difficulty."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "prompt": {
                        "type": "string",
                        "description": "Topic, difficulty and any requirements for the problem"
                    }
                },
                "required": ["prompt"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        if args.prompt.trim().is_empty() {
            return Err(ToolError::InvalidArgs("prompt is empty".into()));
        }
        Ok(self.generate(&args.prompt).await)
    }
}
