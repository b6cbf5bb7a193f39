/// Value types exchanged with tool implementations
///
/// `ToolResult` is what every tool produces, `ToolContext` is what every tool
/// receives besides its parameters. Both serialize in the camelCase wire shape
/// callers already expect (`isError`, `errorDetails`, `sessionId`, ...).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single typed content block of a tool result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Content type, "text" for everything this crate produces
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: text.into(),
        }
    }
}

/// Output of any tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl ToolResult {
    /// Successful result with a single text block
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            is_error: false,
            error_details: None,
            metadata: None,
        }
    }

    /// Failed result with a single text block describing the failure
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(message)],
            is_error: true,
            error_details: None,
            metadata: None,
        }
    }

    pub fn with_error_details(mut self, details: Value) -> Self {
        self.error_details = Some(details);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// All text blocks joined by newlines
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Human-readable failure description: the error details when the tool
    /// supplied a string, otherwise the text content.
    pub fn error_message(&self) -> String {
        match &self.error_details {
            Some(Value::String(details)) => details.clone(),
            Some(details) if !details.is_null() => {
                let text = self.joined_text();
                if text.is_empty() {
                    details.to_string()
                } else {
                    format!("{} ({})", text, details)
                }
            }
            _ => self.joined_text(),
        }
    }

    /// Job id carried in metadata, set on async notices
    pub fn job_id(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get("jobId"))
            .and_then(Value::as_str)
    }
}

/// Execution context handed to every tool invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolContext {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl ToolContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Default::default()
        }
    }

    /// Fresh session-scoped context with a generated session id
    pub fn ephemeral() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_job(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_result_wire_shape() {
        let result = ToolResult::error("boom").with_error_details(json!("disk full"));
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["isError"], json!(true));
        assert_eq!(value["errorDetails"], json!("disk full"));
        assert_eq!(value["content"][0]["type"], json!("text"));
        assert!(value.get("metadata").is_none());
    }

    #[test]
    fn test_error_message_prefers_string_details() {
        let plain = ToolResult::error("boom");
        assert_eq!(plain.error_message(), "boom");

        let detailed = ToolResult::error("boom").with_error_details(json!("disk full"));
        assert_eq!(detailed.error_message(), "disk full");

        let structured = ToolResult::error("boom").with_error_details(json!({"code": 7}));
        assert_eq!(structured.error_message(), "boom ({\"code\":7})");
    }

    #[test]
    fn test_job_id_from_metadata() {
        let result = ToolResult::text("queued").with_metadata("jobId", json!("abc"));
        assert_eq!(result.job_id(), Some("abc"));
        assert_eq!(ToolResult::text("x").job_id(), None);
    }
}
