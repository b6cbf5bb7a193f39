/// Conventional `<tool>-job-result` retrieval tool
///
/// Async notices tell callers to re-submit `{tool_name, arguments: {jobId}}`
/// through dispatch. This tool answers that call from the job store.

use crate::jobs::{retrieval_tool_name, JobStatus, JobStore};
use crate::tool::{InputSchema, PropertySchema, Tool, ToolContext, ToolResult, ValidatedParams};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Job status lookup for jobs started by one tool (or by workflow runs)
pub struct JobResultTool {
    name: String,
    description: String,
    jobs: Arc<JobStore>,
}

impl JobResultTool {
    /// Retrieval tool for jobs started by `tool_name`
    pub fn for_tool(tool_name: &str, jobs: Arc<JobStore>) -> Self {
        Self {
            name: retrieval_tool_name(tool_name),
            description: format!(
                "Check the status of a background `{}` job and fetch its result",
                tool_name
            ),
            jobs,
        }
    }
}

#[async_trait]
impl Tool for JobResultTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::object()
            .property(
                "jobId",
                PropertySchema::string().describe("Job id from the async notice"),
            )
            .required(["jobId"])
    }

    async fn execute(
        &self,
        params: ValidatedParams,
        _config: &Map<String, Value>,
        _context: ToolContext,
    ) -> Result<ToolResult> {
        let job_id = params.str("jobId").unwrap_or_default();

        let Some(job) = self.jobs.get_job(job_id).await else {
            return Ok(ToolResult::error(format!("No job found with id {}", job_id))
                .with_error_details(json!({"kind": "jobNotFound", "jobId": job_id})));
        };

        let result = match job.status {
            JobStatus::Pending | JobStatus::Processing => ToolResult::text(format!(
                "Job {} is {}. Check again shortly with the same arguments.",
                job.id, job.status
            )),
            JobStatus::Completed => ToolResult::text(job.result.clone().unwrap_or_default()),
            JobStatus::Failed => ToolResult::error(format!(
                "Job {} failed: {}",
                job.id,
                job.error.clone().unwrap_or_default()
            ))
            .with_error_details(Value::String(job.error.clone().unwrap_or_default())),
        };

        Ok(result
            .with_metadata("jobId", Value::String(job.id.clone()))
            .with_metadata("status", json!(job.status))
            .with_metadata("updatedAt", json!(job.updated_at)))
    }
}
