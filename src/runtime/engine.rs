/// Workflow execution engine
///
/// Walks a compiled workflow graph from its entry step, dispatching each step's
/// tool through the dispatch facade and following `next` on success or
/// `onError` on failure. Multiple follow-up ids fan out into concurrent
/// branches; a shared ledger guarantees every step runs at most once per run,
/// which also bounds traversal of cyclic graphs.

use crate::error::WorkflowConfigError;
use crate::jobs::{build_async_notice, AsyncNotice, JobStatus, NoticeOptions};
use crate::runtime::dispatch::{take_async_flag, Dispatcher};
use crate::tool::{ToolContext, ToolResult};
use crate::workflow::registry::{CompiledWorkflow, WorkflowRegistry};
use crate::workflow::types::Workflow;
use futures::future::{join_all, BoxFuture};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::{collections::HashSet, sync::Arc};
use tokio::sync::Mutex;

/// Tool name used for the async notice of a whole workflow run
pub const WORKFLOW_JOB_TOOL: &str = "workflow";

/// Outcome of a single executed step
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub step_id: String,
    pub tool: String,
    pub result: ToolResult,
}

/// Aggregated outcome of a workflow run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowOutcome {
    pub workflow_id: String,
    /// False when any step failed without an `onError` target that went on to run
    pub success: bool,
    /// First unrecovered error on failure, otherwise the first branch-ending success
    pub result: Option<ToolResult>,
    /// Step whose error ended the run unrecovered
    pub failed_step: Option<String>,
    /// Executed steps in completion order
    pub steps: Vec<StepRecord>,
}

impl WorkflowOutcome {
    /// How many times `step_id` executed in this run (0 or 1)
    pub fn executions_of(&self, step_id: &str) -> usize {
        self.steps.iter().filter(|record| record.step_id == step_id).count()
    }

    /// Failure description used for the run's job record
    pub fn error_message(&self) -> String {
        match (&self.failed_step, &self.result) {
            (Some(step), Some(result)) => format!("step '{}' failed: {}", step, result.error_message()),
            _ => "workflow failed".to_string(),
        }
    }
}

/// Result of starting a workflow: finished inline or deferred to a job
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum WorkflowRun {
    Completed { outcome: WorkflowOutcome },
    Accepted { notice: AsyncNotice },
}

/// Shared per-run bookkeeping, the only state branches write to
#[derive(Debug, Default)]
struct RunLedger {
    visited: HashSet<String>,
    records: Vec<StepRecord>,
    first_success: Option<ToolResult>,
    first_failure: Option<(String, ToolResult)>,
}

/// Graph-walking workflow executor
#[derive(Debug, Clone)]
pub struct WorkflowEngine {
    /// Dispatch facade used for every step
    dispatcher: Arc<Dispatcher>,
    /// Named workflows for run-by-id
    workflows: Arc<WorkflowRegistry>,
}

impl WorkflowEngine {
    pub fn new(dispatcher: Arc<Dispatcher>, workflows: Arc<WorkflowRegistry>) -> Self {
        Self {
            dispatcher,
            workflows,
        }
    }

    pub fn workflows(&self) -> &Arc<WorkflowRegistry> {
        &self.workflows
    }

    /// Run a registered workflow by id
    pub async fn run_by_id(
        &self,
        workflow_id: &str,
        input: Value,
        context: ToolContext,
    ) -> Result<WorkflowRun, WorkflowConfigError> {
        let compiled = self
            .workflows
            .get(workflow_id)
            .ok_or_else(|| WorkflowConfigError::WorkflowNotFound(workflow_id.to_string()))?;
        self.run(compiled.workflow.clone(), input, context).await
    }

    /// Run `workflow` with `input` as initial context
    ///
    /// The graph is validated before anything executes. With `"async": true`
    /// in `input` one job is created for the whole run and an async notice is
    /// returned immediately; the job is updated once traversal finishes.
    pub async fn run(
        &self,
        workflow: Workflow,
        input: Value,
        context: ToolContext,
    ) -> Result<WorkflowRun, WorkflowConfigError> {
        let compiled = Arc::new(CompiledWorkflow::compile(workflow, self.dispatcher.registry())?);

        let original = input.clone();
        let mut input = input;
        let async_requested = take_async_flag(&mut input);
        let initial = match input {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("input".to_string(), other);
                map
            }
        };

        if !async_requested {
            let outcome = self.execute(Arc::clone(&compiled), initial, context).await;
            return Ok(WorkflowRun::Completed { outcome });
        }

        let jobs = Arc::clone(self.dispatcher.jobs());
        let job_id = jobs.create_job(original).await;

        let mut extra_context = Map::new();
        extra_context.insert("workflowId".to_string(), Value::String(compiled.id().to_string()));
        let notice = build_async_notice(
            &job_id,
            WORKFLOW_JOB_TOOL,
            NoticeOptions {
                extra_context,
                ..Default::default()
            },
        );

        tracing::info!("⏳ Deferred workflow '{}' to job {}", compiled.id(), job_id);

        let engine = self.clone();
        let context = context.with_job(job_id.clone());
        tokio::spawn(async move {
            jobs.update_status(&job_id, JobStatus::Processing, None, None).await;

            let outcome = engine.execute(compiled, initial, context).await;
            if outcome.success {
                let summary = serde_json::to_string(&outcome).unwrap_or_else(|_| "{}".to_string());
                jobs.update_status(&job_id, JobStatus::Completed, Some(summary), None).await;
            } else {
                jobs.update_status(&job_id, JobStatus::Failed, None, Some(outcome.error_message()))
                    .await;
            }
        });

        Ok(WorkflowRun::Accepted { notice })
    }

    /// Traverse a compiled workflow to completion
    pub async fn execute(
        &self,
        compiled: Arc<CompiledWorkflow>,
        initial: Map<String, Value>,
        context: ToolContext,
    ) -> WorkflowOutcome {
        let workflow_start_time = std::time::Instant::now();
        tracing::info!(
            "🚀 Starting workflow execution: {} from step: {}",
            compiled.id(),
            compiled.start_at()
        );

        let ledger = Mutex::new(RunLedger::default());
        self.run_branch(
            &compiled,
            compiled.start_at().to_string(),
            initial,
            &context,
            &ledger,
        )
        .await;

        let ledger = ledger.into_inner();
        let success = ledger.first_failure.is_none();
        let (result, failed_step) = match ledger.first_failure {
            Some((step, result)) => (Some(result), Some(step)),
            None => {
                let fallback = ledger
                    .records
                    .iter()
                    .rev()
                    .find(|record| !record.result.is_error)
                    .map(|record| record.result.clone());
                (ledger.first_success.or(fallback), None)
            }
        };

        if success {
            tracing::info!(
                "🎉 Workflow '{}' completed successfully in {:?} ({} steps)",
                compiled.id(),
                workflow_start_time.elapsed(),
                ledger.records.len()
            );
        } else {
            tracing::warn!(
                "❌ Workflow '{}' failed at step {:?} after {:?}",
                compiled.id(),
                failed_step,
                workflow_start_time.elapsed()
            );
        }

        WorkflowOutcome {
            workflow_id: compiled.id().to_string(),
            success,
            result,
            failed_step,
            steps: ledger.records,
        }
    }

    /// Execute `step_id` and everything it routes to
    ///
    /// Resolves to false when the step did not run because this run already
    /// visited it.
    fn run_branch<'a>(
        &'a self,
        compiled: &'a CompiledWorkflow,
        step_id: String,
        inherited: Map<String, Value>,
        context: &'a ToolContext,
        ledger: &'a Mutex<RunLedger>,
    ) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            if !ledger.lock().await.visited.insert(step_id.clone()) {
                tracing::debug!("⏭️ Step '{}' already visited, ending branch", step_id);
                return false;
            }

            let Some(step) = compiled.step(&step_id) else {
                tracing::error!("❌ Step '{}' vanished from compiled workflow '{}'", step_id, compiled.id());
                return false;
            };

            let params = self.step_params(&step.tool, &inherited, &step.params);
            let step_start_time = std::time::Instant::now();
            tracing::info!("📍 Executing step '{}' (tool: {})", step.id, step.tool);

            let result = match self
                .dispatcher
                .dispatch_sync(&step.tool, Value::Object(params), context.clone())
                .await
            {
                Ok(result) => result,
                Err(e) => ToolResult::error(e.to_string()).with_error_details(Value::String(e.to_string())),
            };

            let followers = if result.is_error { &step.on_error } else { &step.next };
            tracing::info!(
                "{} Step '{}' finished in {:?}, {} follow-up step(s)",
                if result.is_error { "⚠️" } else { "✅" },
                step.id,
                step_start_time.elapsed(),
                followers.len()
            );

            {
                let mut ledger = ledger.lock().await;
                if followers.is_empty() {
                    if result.is_error {
                        if ledger.first_failure.is_none() {
                            ledger.first_failure = Some((step.id.clone(), result.clone()));
                        }
                    } else if ledger.first_success.is_none() {
                        ledger.first_success = Some(result.clone());
                    }
                }
                ledger.records.push(StepRecord {
                    step_id: step.id.clone(),
                    tool: step.tool.clone(),
                    result: result.clone(),
                });
            }

            if followers.is_empty() {
                return true;
            }

            let mut carried = inherited;
            carried.insert(
                "previous".to_string(),
                json!({
                    "stepId": step.id,
                    "text": result.joined_text(),
                    "isError": result.is_error,
                }),
            );

            let executed = join_all(followers.iter().map(|next_id| {
                self.run_branch(compiled, next_id.clone(), carried.clone(), context, ledger)
            }))
            .await;

            // An error route only recovers when one of its targets actually ran
            if result.is_error && !executed.contains(&true) {
                tracing::warn!(
                    "⚠️ Step '{}' failed and every onError target was already visited",
                    step.id
                );
                let mut ledger = ledger.lock().await;
                if ledger.first_failure.is_none() {
                    ledger.first_failure = Some((step.id.clone(), result));
                }
            }
            true
        })
    }

    /// Merge inherited context with a step's static params, step params winning
    ///
    /// Tools with strict schemas only receive the inherited keys they declare.
    fn step_params(
        &self,
        tool: &str,
        inherited: &Map<String, Value>,
        step_params: &Map<String, Value>,
    ) -> Map<String, Value> {
        let declared = self
            .dispatcher
            .registry()
            .lookup(tool)
            .ok()
            .filter(|definition| !definition.input_schema.additional_properties)
            .map(|definition| definition.input_schema.properties.keys().cloned().collect::<HashSet<_>>());

        let mut params: Map<String, Value> = inherited
            .iter()
            .filter(|(key, _)| declared.as_ref().map(|keys| keys.contains(*key)).unwrap_or(true))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        for (key, value) in step_params {
            params.insert(key.clone(), value.clone());
        }
        params
    }
}
