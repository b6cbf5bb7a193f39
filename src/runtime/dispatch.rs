/// Handler dispatch facade
///
/// Every tool call, whether it comes from the HTTP layer or from a workflow
/// step, goes through `Dispatcher::dispatch`: resolve the tool, validate its
/// parameters, then either execute inline or defer to a background job and
/// hand back an async notice.

use crate::error::{DispatchError, ValidationError};
use crate::jobs::{build_async_notice, JobStatus, JobStore, NoticeOptions};
use crate::tool::{ToolContext, ToolDefinition, ToolRegistry, ToolResult, ValidatedParams};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::{json, Value};
use std::{collections::HashMap, panic::AssertUnwindSafe, sync::Arc, time::Duration};

/// Reserved parameter requesting background execution
pub const ASYNC_FLAG: &str = "async";

/// Pluggable validate-then-execute strategy for one tool name
///
/// The defaults validate against the definition's schema and call the
/// definition's execute function.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn validate(&self, definition: &ToolDefinition, params: Value) -> Result<ValidatedParams, ValidationError> {
        definition.validate(params)
    }

    async fn execute(
        &self,
        definition: &ToolDefinition,
        params: ValidatedParams,
        context: ToolContext,
    ) -> anyhow::Result<ToolResult> {
        definition.execute(params, context).await
    }
}

/// Handler used for every tool without a custom one
#[derive(Debug, Default, Clone, Copy)]
pub struct DefinitionHandler;

impl ToolHandler for DefinitionHandler {}

/// Remove the reserved `async` flag, reporting whether it was `true`
pub fn take_async_flag(params: &mut Value) -> bool {
    params
        .as_object_mut()
        .and_then(|map| map.remove(ASYNC_FLAG))
        .map(|flag| flag == Value::Bool(true))
        .unwrap_or(false)
}

/// Uniform dispatch entry point over the tool registry
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    jobs: Arc<JobStore>,
    /// Key: tool name, Value: custom handler replacing the default one
    handlers: ArcSwap<HashMap<String, Arc<dyn ToolHandler>>>,
    default_handler: Arc<dyn ToolHandler>,
    execution_timeout: Option<Duration>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tools", &self.registry.len())
            .field("custom_handlers", &self.handlers.load().len())
            .field("execution_timeout", &self.execution_timeout)
            .finish()
    }
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, jobs: Arc<JobStore>) -> Self {
        Self {
            registry,
            jobs,
            handlers: ArcSwap::new(Arc::new(HashMap::new())),
            default_handler: Arc::new(DefinitionHandler),
            execution_timeout: None,
        }
    }

    /// Bound every tool execution; expiry produces an error result
    pub fn with_execution_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.execution_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn jobs(&self) -> &Arc<JobStore> {
        &self.jobs
    }

    /// Install the handler for `tool_name`, returning the one it replaces
    pub fn register_handler(
        &self,
        tool_name: &str,
        handler: Arc<dyn ToolHandler>,
    ) -> Option<Arc<dyn ToolHandler>> {
        let previous = self.handlers.rcu(|current| {
            let mut next = (**current).clone();
            next.insert(tool_name.to_string(), Arc::clone(&handler));
            Arc::new(next)
        });
        tracing::debug!("🔌 Installed custom handler for tool: {}", tool_name);
        previous.get(tool_name).cloned()
    }

    pub fn remove_handler(&self, tool_name: &str) -> Option<Arc<dyn ToolHandler>> {
        let previous = self.handlers.rcu(|current| {
            let mut next = (**current).clone();
            next.remove(tool_name);
            Arc::new(next)
        });
        previous.get(tool_name).cloned()
    }

    fn handler_for(&self, tool_name: &str) -> Arc<dyn ToolHandler> {
        self.handlers
            .load()
            .get(tool_name)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.default_handler))
    }

    /// Dispatch `tool_name` with `params`
    ///
    /// With `"async": true` in `params` and a tool that supports it, a job is
    /// created and an async notice returned right away; the tool then runs in
    /// the background and records its outcome on the job. Tool failures are
    /// always returned as error results, never as `Err`.
    pub async fn dispatch(
        &self,
        tool_name: &str,
        params: Value,
        context: ToolContext,
    ) -> Result<ToolResult, DispatchError> {
        self.dispatch_inner(tool_name, params, context, true).await
    }

    /// Dispatch ignoring any async request, always executing inline
    pub async fn dispatch_sync(
        &self,
        tool_name: &str,
        params: Value,
        context: ToolContext,
    ) -> Result<ToolResult, DispatchError> {
        self.dispatch_inner(tool_name, params, context, false).await
    }

    async fn dispatch_inner(
        &self,
        tool_name: &str,
        params: Value,
        context: ToolContext,
        allow_async: bool,
    ) -> Result<ToolResult, DispatchError> {
        let definition = self
            .registry
            .lookup(tool_name)
            .map_err(|_| DispatchError::ToolNotFound(tool_name.to_string()))?;

        let original = params.clone();
        let mut params = params;
        let async_requested = take_async_flag(&mut params);

        let handler = self.handler_for(tool_name);
        let validated = handler.validate(&definition, params).map_err(|e| {
            tracing::warn!("❌ Rejected parameters for tool '{}': {}", tool_name, e);
            e
        })?;

        if async_requested && allow_async {
            if definition.supports_async {
                return Ok(self.spawn_job(definition, handler, validated, original, context).await);
            }
            tracing::debug!("Tool '{}' has no async support, executing inline", tool_name);
        }

        tracing::info!("🚀 Dispatching tool: {}", tool_name);
        Ok(execute_guarded(handler.as_ref(), &definition, validated, context, self.execution_timeout).await)
    }

    async fn spawn_job(
        &self,
        definition: Arc<ToolDefinition>,
        handler: Arc<dyn ToolHandler>,
        params: ValidatedParams,
        input: Value,
        context: ToolContext,
    ) -> ToolResult {
        let job_id = self.jobs.create_job(input).await;
        let notice = build_async_notice(&job_id, &definition.name, NoticeOptions::default());

        tracing::info!("⏳ Deferred tool '{}' to job {}", definition.name, job_id);

        let jobs = Arc::clone(&self.jobs);
        let timeout = self.execution_timeout;
        let context = context.with_job(job_id.clone());
        tokio::spawn(async move {
            jobs.update_status(&job_id, JobStatus::Processing, None, None).await;

            let result = execute_guarded(handler.as_ref(), &definition, params, context, timeout).await;
            if result.is_error {
                jobs.update_status(&job_id, JobStatus::Failed, None, Some(result.error_message()))
                    .await;
                tracing::warn!("❌ Job {} ({}) failed", job_id, definition.name);
            } else {
                jobs.update_status(&job_id, JobStatus::Completed, Some(result.joined_text()), None)
                    .await;
                tracing::info!("✅ Job {} ({}) completed", job_id, definition.name);
            }
        });

        notice.into_tool_result()
    }
}

/// Run a handler, converting errors, panics and timeouts into error results
async fn execute_guarded(
    handler: &dyn ToolHandler,
    definition: &ToolDefinition,
    params: ValidatedParams,
    context: ToolContext,
    timeout: Option<Duration>,
) -> ToolResult {
    let start = std::time::Instant::now();
    let execution = AssertUnwindSafe(handler.execute(definition, params, context)).catch_unwind();

    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, execution).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!("⏰ Tool '{}' timed out after {:?}", definition.name, limit);
                return ToolResult::error(format!(
                    "Tool '{}' timed out after {}ms",
                    definition.name,
                    limit.as_millis()
                ))
                .with_error_details(json!({"kind": "timeout", "timeoutMs": limit.as_millis() as u64}));
            }
        },
        None => execution.await,
    };

    let result = match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => ToolResult::error(format!("Tool '{}' failed: {}", definition.name, e))
            .with_error_details(Value::String(format!("{:#}", e))),
        Err(_) => ToolResult::error(format!("Tool '{}' panicked during execution", definition.name))
            .with_error_details(json!({"kind": "panic"})),
    };

    if result.is_error {
        tracing::warn!("❌ Tool '{}' reported an error in {:?}", definition.name, start.elapsed());
    } else {
        tracing::debug!("✅ Tool '{}' completed in {:?}", definition.name, start.elapsed());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{FnTool, InputSchema, PropertySchema};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_tool(name: &str, calls: Arc<AtomicUsize>) -> FnTool {
        FnTool::new(
            name,
            "Counts its calls",
            InputSchema::object()
                .property("topic", PropertySchema::string())
                .required(["topic"]),
            move |params, _| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(ToolResult::text(format!("PRD for {}", params.str("topic").unwrap_or_default())))
                }
            },
        )
    }

    fn dispatcher_with(tools: Vec<FnTool>) -> Dispatcher {
        let registry = Arc::new(ToolRegistry::new());
        for tool in tools {
            registry.register_tool(Arc::new(tool)).unwrap();
        }
        Dispatcher::new(registry, Arc::new(JobStore::new()))
    }

    #[tokio::test]
    async fn test_sync_dispatch_returns_tool_result() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = dispatcher_with(vec![counting_tool("prd-generator", calls.clone())]);

        let result = dispatcher
            .dispatch("prd-generator", json!({"topic": "search"}), ToolContext::new("s"))
            .await
            .unwrap();

        assert_eq!(result.joined_text(), "PRD for search");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_never_touches_job_store() {
        let dispatcher = dispatcher_with(vec![]);

        let err = dispatcher
            .dispatch("ghost", json!({"async": true}), ToolContext::new("s"))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::ToolNotFound(name) if name == "ghost"));
        assert!(dispatcher.jobs().is_empty().await);
    }

    #[tokio::test]
    async fn test_validation_failure_skips_execute() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = dispatcher_with(vec![counting_tool("prd-generator", calls.clone()).asynchronous()]);

        let err = dispatcher
            .dispatch("prd-generator", json!({"async": true}), ToolContext::new("s"))
            .await
            .unwrap_err();

        match err {
            DispatchError::Validation(e) => assert_eq!(e.violations[0].path, "/topic"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(dispatcher.jobs().is_empty().await);
    }

    #[tokio::test]
    async fn test_tool_errors_become_error_results() {
        let failing = FnTool::new("broken", "Always fails", InputSchema::object(), |_, _| async {
            Err(anyhow::anyhow!("template missing"))
        });
        let panicking = FnTool::new("panicky", "Always panics", InputSchema::object(), |_, _| async {
            panic!("boom")
        });
        let dispatcher = dispatcher_with(vec![failing, panicking]);

        let result = dispatcher.dispatch("broken", json!({}), ToolContext::new("s")).await.unwrap();
        assert!(result.is_error);
        assert_eq!(result.error_message(), "template missing");

        let result = dispatcher.dispatch("panicky", json!({}), ToolContext::new("s")).await.unwrap();
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn test_tool_reported_error_is_returned_verbatim() {
        let reported = ToolResult::error("bad repo").with_error_details(json!({"code": 2}));
        let expected = reported.clone();
        let tool = FnTool::new("git-summary", "Summarizes", InputSchema::object(), move |_, _| {
            let reported = reported.clone();
            async move { Ok(reported) }
        });
        let dispatcher = dispatcher_with(vec![tool]);

        let result = dispatcher.dispatch("git-summary", json!({}), ToolContext::new("s")).await.unwrap();
        assert_eq!(result, expected);
    }

    #[tokio::test]
    async fn test_timeout_produces_error_result() {
        let slow = FnTool::new("slow", "Sleeps", InputSchema::object(), |_, _| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ToolResult::text("late"))
        });
        let dispatcher = dispatcher_with(vec![slow]).with_execution_timeout(Some(Duration::from_millis(20)));

        let result = dispatcher.dispatch("slow", json!({}), ToolContext::new("s")).await.unwrap();
        assert!(result.is_error);
        assert_eq!(result.error_details.as_ref().unwrap()["kind"], json!("timeout"));
    }

    #[tokio::test]
    async fn test_async_dispatch_returns_notice_and_completes_job() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = dispatcher_with(vec![counting_tool("prd-generator", calls.clone()).asynchronous()]);

        let notice = dispatcher
            .dispatch("prd-generator", json!({"topic": "search", "async": true}), ToolContext::new("s"))
            .await
            .unwrap();

        let job_id = notice.job_id().unwrap().to_string();
        let text = notice.joined_text();
        assert!(text.contains(&job_id));
        let payload = crate::jobs::notice::parse_retrieval_payload(&text).unwrap();
        assert_eq!(payload.tool_name, "prd-generator-job-result");
        assert_eq!(payload.arguments["jobId"], json!(job_id));

        let job = wait_for_terminal(dispatcher.jobs(), &job_id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result.as_deref(), Some("PRD for search"));
        assert_eq!(job.input["async"], json!(true));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_async_failure_surfaces_on_poll() {
        let tool = FnTool::new("starter-kit", "Fails later", InputSchema::object(), |_, context| async move {
            assert!(context.job_id.is_some());
            Err(anyhow::anyhow!("render failed"))
        })
        .asynchronous();
        let dispatcher = dispatcher_with(vec![tool]);

        let notice = dispatcher
            .dispatch("starter-kit", json!({"async": true}), ToolContext::new("s"))
            .await
            .unwrap();
        assert!(!notice.is_error);

        let job = wait_for_terminal(dispatcher.jobs(), notice.job_id().unwrap()).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("render failed"));
        assert_eq!(job.result, None);
    }

    #[tokio::test]
    async fn test_async_request_on_sync_tool_runs_inline() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = dispatcher_with(vec![counting_tool("prd-generator", calls.clone())]);

        let result = dispatcher
            .dispatch("prd-generator", json!({"topic": "x", "async": true}), ToolContext::new("s"))
            .await
            .unwrap();

        assert_eq!(result.joined_text(), "PRD for x");
        assert!(result.job_id().is_none());
        assert!(dispatcher.jobs().is_empty().await);
    }

    #[tokio::test]
    async fn test_custom_handler_replaces_default() {
        struct Shouting;

        #[async_trait]
        impl ToolHandler for Shouting {
            async fn execute(
                &self,
                definition: &ToolDefinition,
                params: ValidatedParams,
                context: ToolContext,
            ) -> anyhow::Result<ToolResult> {
                let result = definition.execute(params, context).await?;
                Ok(ToolResult::text(result.joined_text().to_uppercase()))
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = dispatcher_with(vec![counting_tool("prd-generator", calls)]);
        assert!(dispatcher.register_handler("prd-generator", Arc::new(Shouting)).is_none());
        assert!(dispatcher.register_handler("prd-generator", Arc::new(Shouting)).is_some());

        let result = dispatcher
            .dispatch("prd-generator", json!({"topic": "api"}), ToolContext::new("s"))
            .await
            .unwrap();
        assert_eq!(result.joined_text(), "PRD FOR API");

        dispatcher.remove_handler("prd-generator");
        let result = dispatcher
            .dispatch("prd-generator", json!({"topic": "api"}), ToolContext::new("s"))
            .await
            .unwrap();
        assert_eq!(result.joined_text(), "PRD for api");
    }

    async fn wait_for_terminal(jobs: &JobStore, id: &str) -> crate::jobs::Job {
        for _ in 0..200 {
            if let Some(job) = jobs.get_job(id).await {
                if job.status.is_terminal() {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {} never finished", id);
    }
}
