/// Tool Layer
///
/// Everything a tool is made of and where tools live:
/// - Result and context value types exchanged with tools
/// - Declarative input schemas with boundary validation
/// - The `Tool` trait and registered `ToolDefinition`s
/// - The lock-free `ToolRegistry`

pub mod types;

pub mod schema;

pub mod definition;

pub mod registry;

pub use definition::{BoxedTool, FnTool, Tool, ToolDefinition};
pub use registry::ToolRegistry;
pub use schema::{InputSchema, PropertySchema, SchemaValidator, ValidatedParams, ValueKind};
pub use types::{ContentBlock, ToolContext, ToolResult};
