/// Core workflow type definitions
///
/// Workflows are plain data: a named graph of steps where each step invokes one
/// tool and names the steps to continue with on success (`next`) and on
/// failure (`onError`). They are exchanged as camelCase JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A complete workflow definition
///
/// Example:
/// `{"id": "wf-docs", "name": "Docs", "description": "", "startAt": "prd",
///   "steps": [{"id": "prd", "name": "PRD", "tool": "prd-generator",
///              "params": {}, "next": [], "onError": []}]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Unique workflow identifier (e.g., "wf-release-notes")
    pub id: String,
    /// Human-readable workflow name
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Entry step id
    pub start_at: String,
    /// Steps of this workflow, ids unique within the workflow
    pub steps: Vec<WorkflowStep>,
}

/// A single tool invocation inside a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    /// Unique step identifier within the workflow (e.g., "summarize")
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Name of the registered tool this step dispatches
    pub tool: String,
    /// Static parameters; they override inherited context on key collisions
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Steps to run when the tool succeeds
    #[serde(default)]
    pub next: Vec<String>,
    /// Steps to run when the tool reports an error
    #[serde(default)]
    pub on_error: Vec<String>,
}

impl WorkflowStep {
    pub fn new(id: &str, tool: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            tool: tool.to_string(),
            params: Map::new(),
            next: Vec::new(),
            on_error: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn then<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.next.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn or_else<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.on_error.extend(ids.into_iter().map(Into::into));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_workflow_wire_format() {
        let workflow: Workflow = serde_json::from_value(json!({
            "id": "wf-docs",
            "name": "Docs",
            "startAt": "prd",
            "steps": [
                {"id": "prd", "name": "PRD", "tool": "prd-generator",
                 "params": {"topic": "search"}, "next": ["stubs"], "onError": ["apology"]},
                {"id": "stubs", "tool": "code-stubs"},
                {"id": "apology", "tool": "echo"}
            ]
        }))
        .unwrap();

        assert_eq!(workflow.description, "");
        let prd = &workflow.steps[0];
        assert_eq!(prd.id, "prd");
        assert_eq!(prd.next, vec!["stubs"]);
        assert_eq!(prd.on_error, vec!["apology"]);
        assert_eq!(workflow.steps[1].name, "");
        assert!(workflow.steps[1].next.is_empty());

        let value = serde_json::to_value(&workflow).unwrap();
        assert_eq!(value["startAt"], json!("prd"));
        assert_eq!(value["steps"][0]["onError"], json!(["apology"]));
    }
}
