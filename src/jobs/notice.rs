/// Async notice builder
///
/// Produces the standard "job accepted" message returned when a call is deferred
/// to a background job, together with the retrieval payload the caller echoes
/// back through dispatch to fetch the outcome later.

use crate::tool::types::ToolResult;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Suffix of the conventional retrieval tool name
pub const JOB_RESULT_SUFFIX: &str = "-job-result";

/// Conventional retrieval tool name for `tool_name`
pub fn retrieval_tool_name(tool_name: &str) -> String {
    format!("{}{}", tool_name, JOB_RESULT_SUFFIX)
}

/// Machine-readable retrieval call: `{tool_name, arguments: {jobId, ...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalPayload {
    pub tool_name: String,
    pub arguments: Map<String, Value>,
}

/// Message plus payload handed back for a deferred call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsyncNotice {
    pub job_id: String,
    pub message: String,
    pub payload: RetrievalPayload,
}

/// Optional knobs of `build_async_notice`
#[derive(Debug, Clone, Default)]
pub struct NoticeOptions {
    /// Defaults to `<tool>-job-result`
    pub retrieval_tool: Option<String>,
    /// Extra retrieval arguments merged next to `jobId`
    pub extra_context: Map<String, Value>,
    /// Replaces the default "how to retrieve" sentence
    pub custom_instruction: Option<String>,
}

/// Build the notice for `job_id` started by `tool_name`
///
/// Pure: the same inputs always produce the same notice. `jobId` always wins
/// over a same-named key in `extra_context`.
pub fn build_async_notice(job_id: &str, tool_name: &str, options: NoticeOptions) -> AsyncNotice {
    let retrieval_tool = options
        .retrieval_tool
        .unwrap_or_else(|| retrieval_tool_name(tool_name));

    let mut arguments = Map::new();
    arguments.insert("jobId".to_string(), Value::String(job_id.to_string()));
    for (key, value) in options.extra_context {
        arguments.entry(key).or_insert(value);
    }

    let payload = RetrievalPayload {
        tool_name: retrieval_tool.clone(),
        arguments,
    };

    let instruction = options.custom_instruction.unwrap_or_else(|| {
        format!(
            "To check progress and fetch the result, call the `{}` tool with these arguments:",
            retrieval_tool
        )
    });

    let payload_json = serde_json::to_string_pretty(&payload)
        .unwrap_or_else(|_| json!({"tool_name": retrieval_tool, "arguments": {"jobId": job_id}}).to_string());

    let message = format!(
        "Job {} accepted: `{}` is running in the background.\n\n{}\n\n```json\n{}\n```",
        job_id, tool_name, instruction, payload_json
    );

    AsyncNotice {
        job_id: job_id.to_string(),
        message,
        payload,
    }
}

impl AsyncNotice {
    /// Render as the tool result returned to the caller, with `jobId` in metadata
    pub fn into_tool_result(self) -> ToolResult {
        let payload = serde_json::to_value(&self.payload).unwrap_or(Value::Null);
        ToolResult::text(self.message)
            .with_metadata("jobId", Value::String(self.job_id))
            .with_metadata("retrieval", payload)
    }
}

/// Extract the retrieval payload from the fenced JSON block of a notice message
pub fn parse_retrieval_payload(message: &str) -> Option<RetrievalPayload> {
    let start = message.find("```json")? + "```json".len();
    let end = start + message[start..].find("```")?;
    serde_json::from_str(message[start..end].trim()).ok()
}
