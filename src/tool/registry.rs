/// Lock-free tool registry using ArcSwap
///
/// Tools are registered once at startup and read on every dispatch. Reads take
/// an atomic snapshot of the whole map; writes swap in a new map, so lookups
/// never block while an administrative call is registering or removing tools.

use crate::error::RegistryError;
use crate::tool::definition::{BoxedTool, ToolDefinition};
use arc_swap::ArcSwap;
use std::{collections::HashMap, sync::Arc};

/// Name-keyed table of tool definitions
///
/// Constructed explicitly and shared through `Arc` with the dispatch facade
/// and the workflow engine; there is no process-global instance.
#[derive(Debug)]
pub struct ToolRegistry {
    /// Key: tool name, Value: immutable definition
    tools: ArcSwap<HashMap<String, Arc<ToolDefinition>>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: ArcSwap::new(Arc::new(HashMap::new())),
        }
    }

    /// Register a tool with an empty per-tool config
    pub fn register_tool(&self, tool: BoxedTool) -> Result<(), RegistryError> {
        self.register(ToolDefinition::new(tool)?)
    }

    /// Register a definition; an existing definition with the same name wins
    /// and the call fails with `DuplicateTool`.
    pub fn register(&self, definition: ToolDefinition) -> Result<(), RegistryError> {
        let name = definition.name.clone();
        let definition = Arc::new(definition);
        let mut duplicate = false;

        self.tools.rcu(|current| {
            if current.contains_key(&name) {
                duplicate = true;
                Arc::clone(current)
            } else {
                duplicate = false;
                let mut next = (**current).clone();
                next.insert(name.clone(), Arc::clone(&definition));
                Arc::new(next)
            }
        });

        if duplicate {
            tracing::warn!("⚠️ Rejected duplicate tool registration: {}", name);
            return Err(RegistryError::DuplicateTool(name));
        }

        tracing::debug!("🔧 Registered tool: {}", name);
        Ok(())
    }

    /// Look up a tool definition by name (lock-free read)
    pub fn lookup(&self, name: &str) -> Result<Arc<ToolDefinition>, RegistryError> {
        self.tools
            .load()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::ToolNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.load().contains_key(name)
    }

    /// All registered definitions, sorted by name
    pub fn list(&self) -> Vec<Arc<ToolDefinition>> {
        let mut definitions: Vec<_> = self.tools.load().values().cloned().collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    pub fn len(&self) -> usize {
        self.tools.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.load().is_empty()
    }

    /// Administrative removal of a single tool
    pub fn unregister(&self, name: &str) -> bool {
        let previous = self.tools.rcu(|current| {
            let mut next = (**current).clone();
            next.remove(name);
            Arc::new(next)
        });

        let removed = previous.contains_key(name);
        if removed {
            tracing::info!("Removed tool from registry: {}", name);
        }
        removed
    }

    /// Administrative reset, used to isolate tests
    pub fn clear(&self) {
        self.tools.store(Arc::new(HashMap::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{FnTool, InputSchema, ToolResult};

    fn named(name: &str, description: &str) -> BoxedTool {
        Arc::new(FnTool::new(name, description, InputSchema::object(), |_, _| async {
            Ok(ToolResult::text("ok"))
        }))
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ToolRegistry::new();
        registry.register_tool(named("prd-generator", "PRDs")).unwrap();

        let definition = registry.lookup("prd-generator").unwrap();
        assert_eq!(definition.description, "PRDs");
        assert!(matches!(
            registry.lookup("missing"),
            Err(RegistryError::ToolNotFound(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let registry = ToolRegistry::new();
        registry.register_tool(named("git-summary", "first")).unwrap();

        let err = registry.register_tool(named("git-summary", "second")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTool(_)));
        assert_eq!(registry.lookup("git-summary").unwrap().description, "first");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_list_is_sorted_and_admin_reset() {
        let registry = ToolRegistry::new();
        registry.register_tool(named("b", "")).unwrap();
        registry.register_tool(named("a", "")).unwrap();

        let names: Vec<_> = registry.list().iter().map(|d| d.name.clone()).collect();
        assert_eq!(names, vec!["a", "b"]);

        assert!(registry.unregister("a"));
        assert!(!registry.unregister("a"));
        registry.clear();
        assert!(registry.is_empty());
    }
}
