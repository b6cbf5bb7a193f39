/// Builtin tools
///
/// Content-producing tools are registered by embedders; the service itself
/// only ships the echo tool and the job retrieval tools.

pub mod echo;

pub mod job_result;

pub use echo::EchoTool;
pub use job_result::JobResultTool;

use crate::error::RegistryError;
use crate::jobs::{retrieval_tool_name, JobStore};
use crate::runtime::engine::WORKFLOW_JOB_TOOL;
use crate::tool::ToolRegistry;
use std::sync::Arc;

/// Register a `<tool>-job-result` tool for every async-capable tool and for
/// workflow runs, skipping names that are already taken
pub fn register_job_result_tools(registry: &ToolRegistry, jobs: &Arc<JobStore>) -> Result<usize, RegistryError> {
    let mut targets: Vec<String> = registry
        .list()
        .iter()
        .filter(|definition| definition.supports_async)
        .map(|definition| definition.name.clone())
        .collect();
    targets.push(WORKFLOW_JOB_TOOL.to_string());

    let mut registered = 0;
    for target in targets {
        if registry.contains(&retrieval_tool_name(&target)) {
            continue;
        }
        registry.register_tool(Arc::new(JobResultTool::for_tool(&target, Arc::clone(jobs))))?;
        registered += 1;
    }

    tracing::debug!("Registered {} job retrieval tools", registered);
    Ok(registered)
}

/// Register the builtin tools plus retrieval tools for everything async
pub fn register_builtin_tools(registry: &ToolRegistry, jobs: &Arc<JobStore>) -> Result<(), RegistryError> {
    registry.register_tool(Arc::new(EchoTool))?;
    register_job_result_tools(registry, jobs)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_include_retrieval_tools() {
        let registry = ToolRegistry::new();
        let jobs = Arc::new(JobStore::new());
        register_builtin_tools(&registry, &jobs).unwrap();

        assert!(registry.contains("echo"));
        assert!(registry.contains("echo-job-result"));
        assert!(registry.contains("workflow-job-result"));

        // second pass finds nothing new to add
        assert_eq!(register_job_result_tools(&registry, &jobs).unwrap(), 0);
    }
}
