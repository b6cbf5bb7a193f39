/// Tool REST endpoints
///
/// Lists registered tools and dispatches single tool calls. Tool failures come
/// back as 200 with `isError: true`; only lookup and validation problems map to
/// error statuses.

use crate::api::{api_error, context_from_headers, parse_body, ApiError, AppState};
use crate::error::DispatchError;
use crate::tool::ToolResult;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};

/// Create tool routes
pub fn create_tool_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tools", get(list_tools))
        .route("/api/tools/{name}", post(dispatch_tool))
}

/// List all tools
///
/// GET /api/tools
/// Returns: { "tools": [{ "name": "...", "description": "...", "inputSchema": {...}, "supportsAsync": false }] }
async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    let tools: Vec<Value> = state
        .dispatcher
        .registry()
        .list()
        .iter()
        .map(|definition| serde_json::to_value(definition.as_ref()).unwrap_or(Value::Null))
        .collect();
    Json(json!({ "tools": tools }))
}

/// Dispatch a tool
///
/// POST /api/tools/{name}
/// Body: tool parameters, `"async": true` defers async-capable tools to a job
async fn dispatch_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<ToolResult>, ApiError> {
    let params = parse_body(&body)?;
    let context = context_from_headers(&headers);

    tracing::info!("📥 Tool call received: {}", name);
    match state.dispatcher.dispatch(&name, params, context).await {
        Ok(result) => Ok(Json(result)),
        Err(DispatchError::ToolNotFound(name)) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("tool '{}' is not registered", name),
        )),
        Err(DispatchError::Validation(e)) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": e.to_string(), "violations": e.violations })),
        )),
    }
}
