/// Toolway: tool dispatch and workflow orchestration service
///
/// This library provides a registry of schema-validated tools, a dispatch facade
/// that can defer long-running calls to tracked background jobs, and a workflow
/// engine that chains tools along success and error edges.

// Core configuration and setup
pub mod config;

// Error taxonomy shared across layers
pub mod error;

// Tool layer - result types, input schemas, definitions and the registry
pub mod tool;

// Job tracking - lifecycle store, change notifications and async notices
pub mod jobs;

// Builtin tools shipped with the service
pub mod tools;

// Workflow management layer - definitions, integrity checks and registry
pub mod workflow;

// Runtime execution - dispatch facade and workflow graph traversal
pub mod runtime;

// HTTP API layer - REST endpoints for tools, jobs and workflows
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use error::{DispatchError, RegistryError, ValidationError, WorkflowConfigError};
pub use jobs::{Job, JobStatus, JobStore};
pub use runtime::{Dispatcher, WorkflowEngine, WorkflowOutcome, WorkflowRun};
pub use server::{build_services, create_app, start_server, Services};
pub use tool::{FnTool, InputSchema, PropertySchema, Tool, ToolContext, ToolRegistry, ToolResult};
pub use workflow::{Workflow, WorkflowStep};
