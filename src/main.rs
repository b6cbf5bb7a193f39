/// Toolway: tool dispatch and workflow orchestration service
///
/// Main entry point for the Toolway server. Initializes configuration and starts
/// the HTTP server with the builtin tools registered.

use toolway::{config::Config, server::start_server};

/// Application entry point
///
/// Initializes the server with configuration from the environment and starts
/// listening for requests. The server provides:
/// - Tool listing and dispatch at /api/tools/*
/// - Job polling at /api/jobs/*
/// - Workflow management and runs at /api/workflows/*
/// - Health check at /healthz
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (defaults to 0.0.0.0:3004, no execution timeout)
    let config = Config::default();

    // Start the server with only the builtin tools
    start_server(config, Vec::new()).await?;

    Ok(())
}
