/// Hot-reload workflow registry using ArcSwap
///
/// Provides lock-free, atomic updates to the in-memory set of named workflows.
/// Each update swaps the entire map pointer, so runs already in flight keep the
/// compiled definition they started with.

use crate::error::WorkflowConfigError;
use crate::tool::ToolRegistry;
use crate::workflow::types::{Workflow, WorkflowStep};
use arc_swap::ArcSwap;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

/// Kind of transition between two steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Success,
    Error,
}

/// Workflow whose graph passed integrity checks
///
/// Every id named by `startAt`, `next` and `onError` exists and every step's
/// tool is registered. Cycles are allowed; the engine visits each step at most
/// once per run.
#[derive(Debug, Clone)]
pub struct CompiledWorkflow {
    /// Base workflow definition
    pub workflow: Workflow,
    /// Key: step id, Value: step definition
    steps: HashMap<String, WorkflowStep>,
    /// Step ids not reachable from the entry step
    pub unreachable_steps: Vec<String>,
    /// Whether any path leads back to an already visited step
    pub has_cycles: bool,
}

impl CompiledWorkflow {
    /// Validate `workflow` against its own ids and the registered tools
    pub fn compile(workflow: Workflow, tools: &ToolRegistry) -> Result<Self, WorkflowConfigError> {
        if workflow.steps.is_empty() {
            return Err(WorkflowConfigError::Empty {
                workflow: workflow.id.clone(),
            });
        }

        let mut graph: DiGraph<String, EdgeKind> = DiGraph::new();
        let mut index_of: HashMap<String, NodeIndex> = HashMap::new();
        let mut steps = HashMap::new();

        for step in &workflow.steps {
            if index_of.contains_key(&step.id) {
                return Err(WorkflowConfigError::DuplicateStep {
                    workflow: workflow.id.clone(),
                    step: step.id.clone(),
                });
            }
            if !tools.contains(&step.tool) {
                return Err(WorkflowConfigError::UnknownTool {
                    workflow: workflow.id.clone(),
                    step: step.id.clone(),
                    tool: step.tool.clone(),
                });
            }
            index_of.insert(step.id.clone(), graph.add_node(step.id.clone()));
            steps.insert(step.id.clone(), step.clone());
        }

        let start = *index_of
            .get(&workflow.start_at)
            .ok_or_else(|| WorkflowConfigError::UnknownStartStep {
                workflow: workflow.id.clone(),
                step: workflow.start_at.clone(),
            })?;

        for step in &workflow.steps {
            let from = index_of[&step.id];
            let edges = step
                .next
                .iter()
                .map(|to| (to, EdgeKind::Success))
                .chain(step.on_error.iter().map(|to| (to, EdgeKind::Error)));

            for (to, kind) in edges {
                let target = index_of.get(to).ok_or_else(|| WorkflowConfigError::UnknownStepReference {
                    workflow: workflow.id.clone(),
                    from: step.id.clone(),
                    to: to.clone(),
                })?;
                graph.add_edge(from, *target, kind);
            }
        }

        let mut reachable = HashSet::new();
        let mut bfs = Bfs::new(&graph, start);
        while let Some(index) = bfs.next(&graph) {
            reachable.insert(index);
        }
        let unreachable_steps: Vec<String> = graph
            .node_indices()
            .filter(|index| !reachable.contains(index))
            .map(|index| graph[index].clone())
            .collect();
        let has_cycles = is_cyclic_directed(&graph);

        if !unreachable_steps.is_empty() {
            tracing::warn!(
                "⚠️ Workflow '{}' has steps unreachable from '{}': {:?}",
                workflow.id,
                workflow.start_at,
                unreachable_steps
            );
        }
        if has_cycles {
            tracing::warn!(
                "⚠️ Workflow '{}' contains cycles, each step still runs at most once per run",
                workflow.id
            );
        }

        Ok(Self {
            workflow,
            steps,
            unreachable_steps,
            has_cycles,
        })
    }

    pub fn id(&self) -> &str {
        &self.workflow.id
    }

    pub fn start_at(&self) -> &str {
        &self.workflow.start_at
    }

    pub fn step(&self, id: &str) -> Option<&WorkflowStep> {
        self.steps.get(id)
    }
}

/// Lock-free registry of named workflows
///
/// Workflows are compiled against the tool registry when registered, so a run
/// by id never starts on a broken graph.
#[derive(Debug)]
pub struct WorkflowRegistry {
    /// Key: workflow_id, Value: compiled workflow definition
    workflows: ArcSwap<HashMap<String, Arc<CompiledWorkflow>>>,
    /// Tool registry used to check step tools
    tools: Arc<ToolRegistry>,
}

impl WorkflowRegistry {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            workflows: ArcSwap::new(Arc::new(HashMap::new())),
            tools,
        }
    }

    /// Add or replace a workflow
    ///
    /// Returns true when an existing workflow with the same id was replaced.
    pub fn register(&self, workflow: Workflow) -> Result<bool, WorkflowConfigError> {
        let compiled = Arc::new(CompiledWorkflow::compile(workflow, &self.tools)?);
        let id = compiled.id().to_string();

        let previous = self.workflows.rcu(|current| {
            let mut next = (**current).clone();
            next.insert(id.clone(), Arc::clone(&compiled));
            Arc::new(next)
        });

        let replaced = previous.contains_key(&id);
        if replaced {
            tracing::info!("🔥 Hot-reloaded workflow: {}", id);
        } else {
            tracing::info!("📊 Registered workflow: {}", id);
        }
        Ok(replaced)
    }

    /// Get a workflow by ID (lock-free read)
    pub fn get(&self, workflow_id: &str) -> Option<Arc<CompiledWorkflow>> {
        self.workflows.load().get(workflow_id).cloned()
    }

    /// All workflow definitions, sorted by id
    pub fn list(&self) -> Vec<Workflow> {
        let mut workflows: Vec<Workflow> = self
            .workflows
            .load()
            .values()
            .map(|compiled| compiled.workflow.clone())
            .collect();
        workflows.sort_by(|a, b| a.id.cmp(&b.id));
        workflows
    }

    /// Remove a workflow, returning whether it existed
    pub fn remove(&self, workflow_id: &str) -> bool {
        let previous = self.workflows.rcu(|current| {
            let mut next = (**current).clone();
            next.remove(workflow_id);
            Arc::new(next)
        });

        let removed = previous.contains_key(workflow_id);
        if removed {
            tracing::info!("Removed workflow from registry: {}", workflow_id);
        }
        removed
    }
}
