/// Configuration management for the toolway service
///
/// Handles server binding, dispatch behaviour and job notification parameters.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Tool dispatch configuration
    pub dispatch: DispatchConfig,
    /// Job tracking configuration
    pub jobs: JobConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Dispatch facade configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Optional upper bound for a single tool execution, in milliseconds.
    /// None means tools run until they finish on their own.
    pub execution_timeout_ms: Option<u64>,
}

impl DispatchConfig {
    pub fn execution_timeout(&self) -> Option<Duration> {
        self.execution_timeout_ms.map(Duration::from_millis)
    }
}

/// Job store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Buffer size of the in-process job event channel
    pub notifier_capacity: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self { notifier_capacity: 1024 }
    }
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for k8s/container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("TOOLWAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("TOOLWAY_PORT")
                    .unwrap_or_else(|_| "3004".to_string())
                    .parse()
                    .unwrap_or(3004),
            },
            dispatch: DispatchConfig {
                execution_timeout_ms: std::env::var("TOOLWAY_EXECUTION_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok()),
            },
            jobs: JobConfig {
                notifier_capacity: std::env::var("TOOLWAY_NOTIFIER_CAPACITY")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1024),
            },
        }
    }
}
