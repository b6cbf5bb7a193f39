/// Typed error taxonomy shared by the registry, dispatch facade and workflow engine
///
/// Tool execution failures are deliberately absent here: they are converted into
/// `ToolResult`s with `is_error = true` so workflows can route them.

use serde::Serialize;
use thiserror::Error;

/// A single schema violation found while validating tool parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaViolation {
    /// JSON-pointer-ish location of the offending value ("" for the root)
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Tool parameters did not match the tool's input schema
#[derive(Debug, Clone, Error)]
#[error("invalid parameters for tool '{tool}': {}", format_violations(.violations))]
pub struct ValidationError {
    pub tool: String,
    pub violations: Vec<SchemaViolation>,
}

fn format_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A tool's input schema could not be compiled
#[derive(Debug, Clone, Error)]
#[error("invalid input schema for tool '{tool}': {message}")]
pub struct SchemaError {
    pub tool: String,
    pub message: String,
}

/// Errors raised by the tool registry
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error(transparent)]
    InvalidSchema(#[from] SchemaError),

    #[error("tool '{0}' is not registered")]
    ToolNotFound(String),
}

/// Errors surfaced to callers of the dispatch facade
///
/// Anything that happens inside a tool's execute function is reported through
/// the returned `ToolResult` instead.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("tool '{0}' is not registered")]
    ToolNotFound(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Workflow graph integrity violations, detected before any step runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowConfigError {
    #[error("workflow '{workflow}' has no steps")]
    Empty { workflow: String },

    #[error("workflow '{workflow}' defines step '{step}' more than once")]
    DuplicateStep { workflow: String, step: String },

    #[error("workflow '{workflow}' starts at unknown step '{step}'")]
    UnknownStartStep { workflow: String, step: String },

    #[error("step '{from}' in workflow '{workflow}' references unknown step '{to}'")]
    UnknownStepReference {
        workflow: String,
        from: String,
        to: String,
    },

    #[error("step '{step}' in workflow '{workflow}' uses unregistered tool '{tool}'")]
    UnknownTool {
        workflow: String,
        step: String,
        tool: String,
    },

    #[error("workflow '{0}' is not registered")]
    WorkflowNotFound(String),
}
