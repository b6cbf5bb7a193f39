/// Workflow Management Layer
///
/// This module handles workflow definitions and the hot-reload registry:
/// - Type definitions (Workflow, WorkflowStep)
/// - Graph integrity checks compiled with petgraph
/// - Lock-free hot-reload registry using ArcSwap

// Core workflow type definitions
pub mod types;

// Hot-reload registry using ArcSwap for zero-downtime updates
pub mod registry;

// Re-export commonly used types
pub use registry::{CompiledWorkflow, WorkflowRegistry};
pub use types::{Workflow, WorkflowStep};
