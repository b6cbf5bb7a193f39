/// HTTP API layer
///
/// Thin axum adapter over the dispatch facade, the job store and the workflow
/// engine:
/// - Tool listing and dispatch at /api/tools/*
/// - Job polling at /api/jobs/*
/// - Workflow management and runs at /api/workflows/*

pub mod jobs;
pub mod tools;
pub mod workflows;

use crate::jobs::JobStore;
use crate::runtime::{Dispatcher, WorkflowEngine};
use crate::tool::ToolContext;
use axum::{
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    /// Dispatch facade for single tool calls
    pub dispatcher: Arc<Dispatcher>,
    /// Workflow engine, also owns the workflow registry
    pub engine: WorkflowEngine,
    /// Job store for polling
    pub jobs: Arc<JobStore>,
}

/// Error response: status plus `{"error": ...}` body
pub type ApiError = (StatusCode, Json<Value>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

/// Parse an optional JSON body, treating an empty body as `null`
pub(crate) fn parse_body(body: &str) -> Result<Value, ApiError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| {
        tracing::warn!("❌ Invalid JSON payload: {}", e);
        api_error(StatusCode::BAD_REQUEST, format!("invalid JSON body: {}", e))
    })
}

/// Parse a JSON body into a typed request, rejecting bad shapes with a 400
pub(crate) fn parse_request<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_value(parse_body(body)?).map_err(|e| {
        tracing::warn!("❌ Invalid request payload: {}", e);
        api_error(StatusCode::BAD_REQUEST, format!("invalid request body: {}", e))
    })
}

/// Build the tool context from `x-session-id` / `x-user-id` headers
pub(crate) fn context_from_headers(headers: &HeaderMap) -> ToolContext {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    let mut context = match header("x-session-id") {
        Some(session_id) => ToolContext::new(session_id),
        None => ToolContext::ephemeral(),
    };
    if let Some(user_id) = header("x-user-id") {
        context = context.with_user(user_id);
    }
    context
}
