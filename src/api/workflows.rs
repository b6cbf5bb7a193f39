/// Workflow management REST API endpoints
///
/// Provides registration, lookup and removal of named workflows with hot-reload
/// semantics, plus runs by id or of an inline definition.

use crate::api::{api_error, context_from_headers, parse_body, parse_request, ApiError, AppState};
use crate::error::WorkflowConfigError;
use crate::runtime::WorkflowRun;
use crate::workflow::types::Workflow;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Response for workflow registration operations
#[derive(Debug, Serialize)]
pub struct WorkflowResponse {
    pub id: String,
    pub message: String,
}

/// Request body for workflow registration
#[derive(Debug, Deserialize)]
pub struct RegisterWorkflowRequest {
    pub workflow: Workflow,
}

/// Request body for running an inline workflow
#[derive(Debug, Deserialize)]
pub struct InlineRunRequest {
    pub workflow: Workflow,
    #[serde(default)]
    pub input: Value,
}

/// Create workflow management routes
pub fn create_workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workflows", post(register_workflow).get(list_workflows))
        .route("/api/workflows/run", post(run_inline_workflow))
        .route("/api/workflows/{id}", get(get_workflow).delete(delete_workflow))
        .route("/api/workflows/{id}/run", post(run_workflow))
}

fn config_error(e: WorkflowConfigError) -> ApiError {
    let status = match e {
        WorkflowConfigError::WorkflowNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    api_error(status, e.to_string())
}

/// Register or replace a workflow
///
/// POST /api/workflows
/// Body: { "workflow": { "id": "...", "name": "...", "startAt": "...", "steps": [...] } }
async fn register_workflow(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<WorkflowResponse>, ApiError> {
    let workflow = parse_request::<RegisterWorkflowRequest>(&body)?.workflow;

    if workflow.id.is_empty() || workflow.name.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "workflow id and name are required"));
    }

    let id = workflow.id.clone();
    let name = workflow.name.clone();
    let replaced = state.engine.workflows().register(workflow).map_err(|e| {
        tracing::error!("Failed to register workflow {}: {}", id, e);
        config_error(e)
    })?;

    Ok(Json(WorkflowResponse {
        id,
        message: if replaced {
            format!("Workflow '{}' updated successfully", name)
        } else {
            format!("Workflow '{}' created successfully", name)
        },
    }))
}

/// GET /api/workflows
async fn list_workflows(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "workflows": state.engine.workflows().list() }))
}

/// GET /api/workflows/{id}
async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Workflow>, ApiError> {
    state
        .engine
        .workflows()
        .get(&id)
        .map(|compiled| Json(compiled.workflow.clone()))
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("workflow '{}' not found", id)))
}

/// DELETE /api/workflows/{id}
async fn delete_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if state.engine.workflows().remove(&id) {
        Ok(Json(json!({ "message": "Workflow deleted successfully" })))
    } else {
        Err(api_error(StatusCode::NOT_FOUND, format!("workflow '{}' not found", id)))
    }
}

/// Run a registered workflow
///
/// POST /api/workflows/{id}/run
/// Body: initial input; `"async": true` tracks the run as one job
async fn run_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WorkflowRun>, ApiError> {
    let input = parse_body(&body)?;
    tracing::info!("📥 Workflow run requested: {}", id);

    state
        .engine
        .run_by_id(&id, input, context_from_headers(&headers))
        .await
        .map(Json)
        .map_err(config_error)
}

/// Run an inline workflow definition without registering it
///
/// POST /api/workflows/run
/// Body: { "workflow": {...}, "input": {...} }
async fn run_inline_workflow(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WorkflowRun>, ApiError> {
    let payload: InlineRunRequest = parse_request(&body)?;
    state
        .engine
        .run(payload.workflow, payload.input, context_from_headers(&headers))
        .await
        .map(Json)
        .map_err(config_error)
}
