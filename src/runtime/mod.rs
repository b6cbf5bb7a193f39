/// Runtime Execution Layer
///
/// This module runs tools and workflows. It handles:
/// - Validate-then-execute dispatch of single tool calls
/// - Deferring async-capable calls to tracked background jobs
/// - Graph traversal of workflows with success and error routing

// Handler dispatch facade over the tool registry
pub mod dispatch;

// Workflow graph execution built on the dispatch facade
pub mod engine;

// Re-export main types
pub use dispatch::{DefinitionHandler, Dispatcher, ToolHandler};
pub use engine::{StepRecord, WorkflowEngine, WorkflowOutcome, WorkflowRun};
