//! Splicing a new step into an existing connection.

use crate::error::EditError;
use crate::projection::VisualEdge;
use crate::toolbar::ToolbarNode;
use crate::variant;
use flowcanvas_core::{Clock, IdGenerator};
use flowcanvas_workflow::{Action, ActionType, Workflow};
use tracing::debug;

/// Splices `new_action` into `edge`.
///
/// Every branch of the edge's source that currently leads to the edge's
/// target is redirected to `new_action`, keeping its label. `new_action` is
/// placed immediately before the exit step and must already lead to the
/// edge's target. `actions` is left untouched.
///
/// # Errors
///
/// - `DanglingEdgeSource` / `DanglingEdgeTarget` if either end of the edge is
///   not a step of `actions`
/// - `DuplicateActionId` if `new_action`'s id is already taken
/// - `MisdirectedAction` if `new_action` has no branch, or a branch that
///   does not lead to the edge's target
/// - `StaleEdge` if the source no longer has any branch to the target
/// - `MissingExit` if there is no exit step to insert before
pub fn splice(
    actions: &[Action],
    new_action: Action,
    edge: &VisualEdge,
) -> Result<Vec<Action>, EditError> {
    let source_index = actions
        .iter()
        .position(|action| action.id == edge.source)
        .ok_or_else(|| EditError::DanglingEdgeSource {
            edge_id: edge.id.clone(),
            source: edge.source.clone(),
        })?;

    if !actions.iter().any(|action| action.id == edge.target) {
        return Err(EditError::DanglingEdgeTarget {
            edge_id: edge.id.clone(),
            target: edge.target.clone(),
        });
    }

    if actions.iter().any(|action| action.id == new_action.id) {
        return Err(EditError::DuplicateActionId {
            action_id: new_action.id,
        });
    }

    let leads_elsewhere = new_action
        .next_actions
        .iter()
        .any(|(_, next)| next.action_id != edge.target);
    if leads_elsewhere || !new_action.points_to(&edge.target) {
        return Err(EditError::MisdirectedAction {
            action_id: new_action.id,
            target: edge.target.clone(),
        });
    }

    let exit_index = actions
        .iter()
        .position(|action| action.action_type == ActionType::Exit)
        .ok_or(EditError::MissingExit)?;

    let mut updated = actions.to_vec();
    let mut redirected = 0;
    for (_, next) in updated[source_index].next_actions.iter_mut() {
        if next.action_id == edge.target {
            next.action_id = new_action.id.clone();
            redirected += 1;
        }
    }
    if redirected == 0 {
        return Err(EditError::StaleEdge {
            edge_id: edge.id.clone(),
        });
    }

    debug!(
        edge_id = %edge.id,
        action_id = %new_action.id,
        redirected,
        "spliced step into edge"
    );
    updated.insert(exit_index, new_action);
    Ok(updated)
}

/// Builds steps from toolbar items and splices them into edges.
///
/// Ids and timestamps come from the injected generator and clock.
pub struct InsertionEngine<'a> {
    clock: &'a dyn Clock,
    ids: &'a dyn IdGenerator,
}

impl<'a> InsertionEngine<'a> {
    #[must_use]
    pub fn new(clock: &'a dyn Clock, ids: &'a dyn IdGenerator) -> Self {
        Self { clock, ids }
    }

    /// Creates the step `toolbar` describes, leading to the edge's target.
    ///
    /// # Errors
    ///
    /// Fails if the toolbar item's type cannot be inserted.
    pub fn new_action(&self, toolbar: &ToolbarNode, edge: &VisualEdge) -> Result<Action, EditError> {
        variant::from_toolbar_node(toolbar, edge, self.ids, self.clock)
    }

    /// Inserts a new step of the toolbar item's type on `edge`, returning the
    /// updated step list.
    ///
    /// # Errors
    ///
    /// See [`InsertionEngine::new_action`] and [`splice`].
    pub fn insert(
        &self,
        workflow: &Workflow,
        toolbar: &ToolbarNode,
        edge: &VisualEdge,
    ) -> Result<Vec<Action>, EditError> {
        let new_action = self.new_action(toolbar, edge)?;
        splice(&workflow.actions, new_action, edge)
    }
}
