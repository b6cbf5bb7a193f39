/// Server setup and initialization
///
/// Wires together all components: tool registry, job store, dispatch facade,
/// workflow engine and HTTP routes.

use crate::{
    api::{
        jobs::create_job_routes, tools::create_tool_routes, workflows::create_workflow_routes,
        AppState,
    },
    config::Config,
    jobs::{BroadcastNotifier, JobStore},
    runtime::{Dispatcher, WorkflowEngine},
    tool::{BoxedTool, ToolRegistry},
    tools::register_builtin_tools,
    workflow::WorkflowRegistry,
};
use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Fully wired core services, shared by the HTTP layer and embedders
#[derive(Clone)]
pub struct Services {
    pub registry: Arc<ToolRegistry>,
    pub jobs: Arc<JobStore>,
    pub notifier: Arc<BroadcastNotifier>,
    pub dispatcher: Arc<Dispatcher>,
    pub engine: WorkflowEngine,
}

/// Build the core services with the builtin tools plus `extra_tools`
///
/// Retrieval tools are added for every async-capable tool, including the
/// extra ones.
pub fn build_services(config: &Config, extra_tools: Vec<BoxedTool>) -> Result<Services> {
    tracing::info!("🔔 Initializing job store with broadcast notifier");
    let notifier = Arc::new(BroadcastNotifier::new(config.jobs.notifier_capacity));
    let jobs = Arc::new(JobStore::with_notifier(notifier.clone()));

    tracing::info!("🔧 Initializing tool registry");
    let registry = Arc::new(ToolRegistry::new());
    for tool in extra_tools {
        registry
            .register_tool(tool)
            .map_err(|e| anyhow::anyhow!("Failed to register tool: {}", e))?;
    }
    register_builtin_tools(&registry, &jobs)
        .map_err(|e| anyhow::anyhow!("Failed to register builtin tools: {}", e))?;
    tracing::info!("📦 {} tools registered", registry.len());

    tracing::info!("🚀 Initializing dispatch facade and workflow engine");
    let dispatcher = Arc::new(
        Dispatcher::new(Arc::clone(&registry), Arc::clone(&jobs))
            .with_execution_timeout(config.dispatch.execution_timeout()),
    );
    let workflows = Arc::new(WorkflowRegistry::new(Arc::clone(&registry)));
    let engine = WorkflowEngine::new(Arc::clone(&dispatcher), workflows);

    Ok(Services {
        registry,
        jobs,
        notifier,
        dispatcher,
        engine,
    })
}

/// Create the Axum router for already built services
pub fn create_router(services: &Services) -> Router {
    let app_state = AppState {
        dispatcher: Arc::clone(&services.dispatcher),
        engine: services.engine.clone(),
        jobs: Arc::clone(&services.jobs),
    };

    Router::new()
        // Health check endpoint
        .route("/healthz", get(health_check))
        // Tool listing and dispatch
        .merge(create_tool_routes())
        // Job polling
        .merge(create_job_routes())
        // Workflow management and runs
        .merge(create_workflow_routes())
        .with_state(app_state)
}

/// Create the main Axum application with all routes
pub fn create_app(config: &Config, extra_tools: Vec<BoxedTool>) -> Result<Router> {
    let services = build_services(config, extra_tools)?;
    tracing::info!("✅ Application initialized successfully");
    Ok(create_router(&services))
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config, extra_tools: Vec<BoxedTool>) -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting toolway server...");

    let app = create_app(&config, extra_tools)?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Health check endpoint handler
async fn health_check() -> &'static str {
    "ok"
}
