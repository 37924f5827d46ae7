//! Directed view of a workflow's step graph using petgraph.
//!
//! The step list stays the source of truth; this view is built on demand for
//! structural queries (dangling references, reachability, counts).

use crate::definition::Workflow;
use crate::error::ValidationError;
use flowcanvas_core::ActionId;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::{HashMap, HashSet};

/// A petgraph directed graph of step ids, with branch names on the edges.
#[derive(Debug, Clone)]
pub struct ActionGraph {
    graph: DiGraph<ActionId, String>,
    /// Map from ActionId to petgraph's NodeIndex for O(1) lookup.
    node_index_map: HashMap<ActionId, NodeIndex>,
}

impl ActionGraph {
    /// Builds the graph for a workflow.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DanglingReference`] if any branch points at
    /// a step id that is not in the workflow.
    pub fn from_workflow(workflow: &Workflow) -> Result<Self, ValidationError> {
        let mut graph = DiGraph::new();
        let mut node_index_map = HashMap::new();

        for action in &workflow.actions {
            let index = graph.add_node(action.id.clone());
            node_index_map.insert(action.id.clone(), index);
        }

        for action in &workflow.actions {
            let source = node_index_map[&action.id];
            for (branch, next) in action.next_actions.iter() {
                let target = node_index_map.get(&next.action_id).ok_or_else(|| {
                    ValidationError::DanglingReference {
                        source: action.id.clone(),
                        branch: branch.to_string(),
                        target: next.action_id.clone(),
                    }
                })?;
                graph.add_edge(source, *target, branch.to_string());
            }
        }

        Ok(Self {
            graph,
            node_index_map,
        })
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of connections.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns every step reachable from `start`, including `start` itself.
    #[must_use]
    pub fn reachable_from(&self, start: &ActionId) -> HashSet<ActionId> {
        let Some(&index) = self.node_index_map.get(start) else {
            return HashSet::new();
        };

        let mut reachable = HashSet::new();
        let mut dfs = Dfs::new(&self.graph, index);
        while let Some(visited) = dfs.next(&self.graph) {
            if let Some(id) = self.graph.node_weight(visited) {
                reachable.insert(id.clone());
            }
        }
        reachable
    }
}
