/// Tool contract and registered tool descriptors

use crate::error::{SchemaError, ValidationError};
use crate::tool::schema::{InputSchema, SchemaValidator, ValidatedParams};
use crate::tool::types::{ToolContext, ToolResult};
use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Core trait implemented by every tool
///
/// `execute` returning `Err` is a tool-internal failure; the dispatch facade
/// turns it into a `ToolResult` with `is_error = true`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name used as registry key
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn input_schema(&self) -> InputSchema;

    /// Whether callers may defer this tool to a background job
    fn supports_async(&self) -> bool {
        false
    }

    async fn execute(
        &self,
        params: ValidatedParams,
        config: &Map<String, Value>,
        context: ToolContext,
    ) -> Result<ToolResult>;
}

/// Type alias for shared tools
pub type BoxedTool = Arc<dyn Tool>;

type Handler =
    dyn Fn(ValidatedParams, ToolContext) -> BoxFuture<'static, Result<ToolResult>> + Send + Sync;

/// Closure-backed tool, handy for small builtins and tests
#[derive(Clone)]
pub struct FnTool {
    name: String,
    description: String,
    schema: InputSchema,
    supports_async: bool,
    handler: Arc<Handler>,
}

impl FnTool {
    pub fn new<F, Fut>(name: &str, description: &str, schema: InputSchema, handler: F) -> Self
    where
        F: Fn(ValidatedParams, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<ToolResult>> + Send + 'static,
    {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            schema,
            supports_async: false,
            handler: Arc::new(move |params, context| Box::pin(handler(params, context))),
        }
    }

    /// Allow deferring this tool to a background job
    pub fn asynchronous(mut self) -> Self {
        self.supports_async = true;
        self
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> InputSchema {
        self.schema.clone()
    }

    fn supports_async(&self) -> bool {
        self.supports_async
    }

    async fn execute(
        &self,
        params: ValidatedParams,
        _config: &Map<String, Value>,
        context: ToolContext,
    ) -> Result<ToolResult> {
        (self.handler)(params, context).await
    }
}

/// Immutable descriptor of a registered tool
///
/// Captures the tool's metadata once at registration together with the
/// per-tool configuration passed to every execution. The input schema is
/// compiled here, so every dispatch reuses the same validator.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
    pub supports_async: bool,
    #[serde(skip)]
    pub config: Map<String, Value>,
    #[serde(skip)]
    validator: SchemaValidator,
    #[serde(skip)]
    tool: BoxedTool,
}

impl ToolDefinition {
    pub fn new(tool: BoxedTool) -> Result<Self, SchemaError> {
        Self::with_config(tool, Map::new())
    }

    pub fn with_config(tool: BoxedTool, config: Map<String, Value>) -> Result<Self, SchemaError> {
        let name = tool.name().to_string();
        let input_schema = tool.input_schema();
        let validator = input_schema.compile(&name)?;

        Ok(Self {
            name,
            description: tool.description().to_string(),
            input_schema,
            supports_async: tool.supports_async(),
            config,
            validator,
            tool,
        })
    }

    pub fn validate(&self, params: Value) -> Result<ValidatedParams, ValidationError> {
        self.validator.validate(params)
    }

    pub async fn execute(&self, params: ValidatedParams, context: ToolContext) -> Result<ToolResult> {
        self.tool.execute(params, &self.config, context).await
    }
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("supports_async", &self.supports_async)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fn_tool_definition() {
        let tool = FnTool::new("echo", "Echo input back", InputSchema::object(), |params, _| async move {
            Ok(ToolResult::text(params.into_value().to_string()))
        });
        let definition = ToolDefinition::new(Arc::new(tool)).unwrap();

        assert_eq!(definition.name, "echo");
        assert!(!definition.supports_async);

        let params = definition.validate(json!({"msg": "hello"})).unwrap();
        let result = definition
            .execute(params, ToolContext::new("s1"))
            .await
            .unwrap();
        assert_eq!(result.joined_text(), r#"{"msg":"hello"}"#);
    }

    #[test]
    fn test_definition_serializes_metadata_only() {
        let tool = FnTool::new("slow", "Slow tool", InputSchema::object(), |_, _| async {
            Ok(ToolResult::text("done"))
        })
        .asynchronous();
        let value = serde_json::to_value(ToolDefinition::new(Arc::new(tool)).unwrap()).unwrap();

        assert_eq!(value["name"], json!("slow"));
        assert_eq!(value["supportsAsync"], json!(true));
        assert_eq!(value["inputSchema"]["type"], json!("object"));
        assert!(value.get("config").is_none());
    }

    #[test]
    fn test_uncompilable_schema_is_rejected() {
        let mut schema = InputSchema::object();
        schema.kind = "tuple-ish".to_string();
        let tool = FnTool::new("odd", "Odd schema", schema, |_, _| async { Ok(ToolResult::text("never")) });

        let err = ToolDefinition::new(Arc::new(tool)).unwrap_err();
        assert_eq!(err.tool, "odd");
    }

    #[test]
    fn test_compiled_validator_accepts_integral_floats() {
        let schema = InputSchema::object().property("n", crate::tool::PropertySchema::integer());
        let tool = FnTool::new("count", "Counts", schema, |_, _| async { Ok(ToolResult::text("ok")) });
        let definition = ToolDefinition::new(Arc::new(tool)).unwrap();

        let params = definition.validate(json!({"n": 1.0})).unwrap();
        assert_eq!(params.i64("n"), Some(1));
        assert!(definition.validate(json!({"n": 1.5})).is_err());
    }
}
