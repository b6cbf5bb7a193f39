/// Echo tool, returns its message; useful for smoke tests and workflow wiring

use crate::tool::{InputSchema, PropertySchema, Tool, ToolContext, ToolResult, ValidatedParams};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Return the given message, optionally after a delay or as an error"
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::object()
            .property("message", PropertySchema::string().describe("Text to return"))
            .property(
                "delayMs",
                PropertySchema::integer()
                    .describe("Milliseconds to wait before answering")
                    .with_default(0),
            )
            .property(
                "fail",
                PropertySchema::boolean()
                    .describe("Answer with an error result instead")
                    .with_default(false),
            )
            .required(["message"])
    }

    fn supports_async(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        params: ValidatedParams,
        _config: &Map<String, Value>,
        _context: ToolContext,
    ) -> Result<ToolResult> {
        let delay = params.i64("delayMs").unwrap_or(0).max(0) as u64;
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let message = params.str("message").unwrap_or_default();
        if params.bool("fail").unwrap_or(false) {
            return Ok(ToolResult::error(message));
        }
        Ok(ToolResult::text(message))
    }
}
