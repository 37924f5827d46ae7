//! Projection of a workflow onto a renderable node/edge graph.
//!
//! The workflow is the single source of truth. A [`FlowGraph`] is rebuilt from
//! it after every change and is never edited and written back on its own.

use crate::error::EditError;
use crate::geometry::Point;
use crate::handle::{Handle, source_handle_id, target_handle_id};
use crate::variant::ActionVariant;
use flowcanvas_core::ActionId;
use flowcanvas_workflow::{Action, ActionType, Workflow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A rendered step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualNode {
    /// Same as the step id.
    pub id: ActionId,
    #[serde(rename = "type")]
    pub node_type: ActionType,
    /// The step itself.
    pub data: Action,
    /// Layout-owned; projection always places nodes at the origin.
    pub position: Point,
    pub handles: Vec<Handle>,
    pub deletable: bool,
}

impl VisualNode {
    /// Looks up a handle by id.
    #[must_use]
    pub fn handle(&self, handle_id: &str) -> Option<&Handle> {
        self.handles.iter().find(|handle| handle.id == handle_id)
    }
}

/// A rendered connection, one per `next_actions` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualEdge {
    pub id: String,
    pub branch: String,
    pub source: ActionId,
    pub source_handle: String,
    pub target: ActionId,
    pub target_handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl VisualEdge {
    /// Builds the edge for `source --branch--> target`.
    #[must_use]
    pub fn new(branch: &str, source: &ActionId, target: &ActionId, label: Option<&str>) -> Self {
        Self {
            id: edge_id(branch, source, target),
            branch: branch.to_string(),
            source: source.clone(),
            source_handle: source_handle_id(branch, source),
            target: target.clone(),
            target_handle: target_handle_id(target),
            label: label.map(str::to_string),
        }
    }
}

/// Id of the edge for `source --branch--> target`: `{branch}_{source}->{target}`.
#[must_use]
pub fn edge_id(branch: &str, source: &ActionId, target: &ActionId) -> String {
    format!("{branch}_{source}->{target}")
}

/// The projected graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowGraph {
    pub nodes: Vec<VisualNode>,
    pub edges: Vec<VisualEdge>,
}

impl FlowGraph {
    #[must_use]
    pub fn node(&self, id: &ActionId) -> Option<&VisualNode> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    #[must_use]
    pub fn edge(&self, edge_id: &str) -> Option<&VisualEdge> {
        self.edges.iter().find(|edge| edge.id == edge_id)
    }

    /// Applies layout positions. Nodes without an entry keep their position.
    #[must_use]
    pub fn with_positions(mut self, positions: &HashMap<ActionId, Point>) -> Self {
        for node in &mut self.nodes {
            if let Some(position) = positions.get(&node.id) {
                node.position = *position;
            }
        }
        self
    }
}

/// Projects `workflow` onto nodes and edges.
///
/// Nodes follow the order of `workflow.actions`; edges follow the same order
/// and, within a step, the persisted order of its `next_actions`.
///
/// # Errors
///
/// Fails if any step has a type without a variant.
pub fn project(workflow: &Workflow) -> Result<FlowGraph, EditError> {
    let mut graph = FlowGraph {
        nodes: Vec::with_capacity(workflow.actions.len()),
        edges: Vec::with_capacity(workflow.connection_count()),
    };

    for action in &workflow.actions {
        let variant = ActionVariant::of(action)?;
        graph.nodes.push(VisualNode {
            id: action.id.clone(),
            node_type: action.action_type.clone(),
            data: action.clone(),
            position: Point::default(),
            handles: variant.handles(action),
            deletable: variant.is_deletable(),
        });

        graph
            .edges
            .extend(action.next_actions.iter().map(|(branch, next)| {
                VisualEdge::new(branch, &action.id, &next.action_id, next.label.as_deref())
            }));
    }

    Ok(graph)
}
