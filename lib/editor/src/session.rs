//! An editing session over one workflow.
//!
//! The session keeps the last saved workflow and a working copy. Every edit
//! runs a pure engine function over the working copy and replaces it with the
//! result, so the previous value is never mutated. Storage is touched only by
//! [`EditorSession::load`] and [`EditorSession::save`].

use crate::config::EditorConfig;
use crate::delete::delete_actions;
use crate::dropzone::{CanvasTransform, DragSession, Dropzone};
use crate::error::EditorError;
use crate::geometry::Point;
use crate::insert::{InsertionEngine, splice};
use crate::projection::{FlowGraph, VisualEdge, project};
use crate::toolbar::ToolbarNode;
use crate::variant::{self, ActionVariant};
use flowcanvas_core::{
    ActionId, Clock, IdGenerator, Result, SystemClock, UlidGenerator, WorkflowId,
};
use flowcanvas_workflow::{Action, Workflow, WorkflowStore, WorkflowUpdate};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Editing state for a single workflow.
pub struct EditorSession {
    original: Workflow,
    working: Workflow,
    config: EditorConfig,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    positions: HashMap<ActionId, Point>,
    drag: DragSession,
}

impl EditorSession {
    /// Opens `workflow` for editing with the system clock and ULID step ids.
    #[must_use]
    pub fn new(workflow: Workflow, config: EditorConfig) -> Self {
        Self {
            original: workflow.clone(),
            working: workflow,
            config,
            clock: Arc::new(SystemClock),
            ids: Arc::new(UlidGenerator),
            positions: HashMap::new(),
            drag: DragSession::Idle,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Loads a workflow from `store`. The unsaved id (`new`) opens a blank
    /// draft without asking the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot produce the workflow.
    #[instrument(skip(store, id, config), fields(workflow_id = %id))]
    pub async fn load(
        store: &dyn WorkflowStore,
        id: &WorkflowId,
        config: EditorConfig,
    ) -> Result<Self, EditorError> {
        if id.is_unsaved() {
            debug!("opening blank draft");
            return Ok(Self::new(Workflow::new_draft(), config));
        }

        let workflow = store.get_workflow(id).await.map_err(EditorError::from)?;
        info!(steps = workflow.actions.len(), "workflow loaded");
        Ok(Self::new(workflow, config))
    }

    /// The working copy.
    #[must_use]
    pub fn workflow(&self) -> &Workflow {
        &self.working
    }

    /// The workflow as last loaded or saved.
    #[must_use]
    pub fn original(&self) -> &Workflow {
        &self.original
    }

    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Whether the working copy differs from the last saved workflow.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.working != self.original
    }

    /// Projects the working copy, with any layout positions applied.
    ///
    /// # Errors
    ///
    /// Returns an error if a step has an unsupported type.
    pub fn graph(&self) -> Result<FlowGraph, EditorError> {
        let graph = project(&self.working).map_err(EditorError::from)?;
        Ok(graph.with_positions(&self.positions))
    }

    /// Records a layout position for a node.
    pub fn set_node_position(&mut self, action_id: ActionId, position: Point) {
        self.positions.insert(action_id, position);
    }

    /// Inserts a step of the toolbar item's type on `edge` and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the item cannot be created or the edge is not
    /// part of the working copy.
    #[instrument(skip(self, toolbar, edge), fields(workflow_id = %self.working.id, edge_id = %edge.id))]
    pub fn insert(
        &mut self,
        toolbar: &ToolbarNode,
        edge: &VisualEdge,
    ) -> Result<ActionId, EditorError> {
        let engine = InsertionEngine::new(self.clock.as_ref(), self.ids.as_ref());
        let new_action = engine.new_action(toolbar, edge).map_err(EditorError::from)?;
        let action_id = new_action.id.clone();

        let actions =
            splice(&self.working.actions, new_action, edge).map_err(EditorError::from)?;
        self.replace_actions(actions);

        info!(action_id = %action_id, "step inserted");
        Ok(action_id)
    }

    /// Deletes steps and reconnects the graph around them.
    ///
    /// # Errors
    ///
    /// Returns an error if a step is unknown, is the trigger or exit, or the
    /// graph around it is corrupted.
    #[instrument(skip(self), fields(workflow_id = %self.working.id))]
    pub fn delete(&mut self, action_ids: &[ActionId]) -> Result<(), EditorError> {
        for action_id in action_ids {
            let action = self.working.action(action_id).ok_or_else(|| {
                EditorError::UnknownAction {
                    action_id: action_id.clone(),
                }
            })?;
            if !ActionVariant::of(action)
                .map_err(EditorError::from)?
                .is_deletable()
            {
                return Err(EditorError::ProtectedAction {
                    action_id: action_id.clone(),
                }
                .into());
            }
        }

        let actions =
            delete_actions(&self.working.actions, action_ids).map_err(EditorError::from)?;
        self.replace_actions(actions);
        for action_id in action_ids {
            self.positions.remove(action_id);
        }

        info!(deleted = action_ids.len(), "steps deleted");
        Ok(())
    }

    /// Sets one input of a step.
    ///
    /// # Errors
    ///
    /// Returns an error if the step is unknown or the input is rejected.
    #[instrument(skip(self, value), fields(workflow_id = %self.working.id))]
    pub fn set_input(
        &mut self,
        action_id: &ActionId,
        key: &str,
        value: JsonValue,
    ) -> Result<(), EditorError> {
        let action = self
            .working
            .action(action_id)
            .ok_or_else(|| EditorError::UnknownAction {
                action_id: action_id.clone(),
            })?;
        let updated = variant::set_input(action, key, value).map_err(EditorError::from)?;

        let actions = self
            .working
            .actions
            .iter()
            .map(|action| {
                if &action.id == action_id {
                    updated.clone()
                } else {
                    action.clone()
                }
            })
            .collect();
        self.replace_actions(actions);
        Ok(())
    }

    /// Starts dragging a toolbar item, placing a dropzone on every edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the working copy cannot be projected.
    pub fn begin_drag(&mut self, toolbar: ToolbarNode) -> Result<(), EditorError> {
        let graph = self.graph()?;
        self.drag = DragSession::begin(toolbar, &graph, &self.config);
        Ok(())
    }

    /// Moves the dragged item to `screen` and returns the highlighted dropzone.
    pub fn drag_over(&mut self, screen: Point, canvas: &dyn CanvasTransform) -> Option<&Dropzone> {
        self.drag = std::mem::take(&mut self.drag).pointer_moved(screen, canvas, &self.config.probe);
        self.drag.active_dropzone()
    }

    /// Dropzones of the current drag; empty when not dragging.
    #[must_use]
    pub fn dropzones(&self) -> &[Dropzone] {
        self.drag.dropzones()
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Drops the dragged item. If a dropzone is highlighted the item is
    /// inserted on its edge and the new step's id returned. The drag ends
    /// either way.
    ///
    /// # Errors
    ///
    /// Returns an error if the insertion is rejected.
    pub fn drop_toolbar_item(&mut self) -> Result<Option<ActionId>, EditorError> {
        match std::mem::take(&mut self.drag).finish() {
            Some(pending) => self.insert(&pending.toolbar, &pending.edge).map(Some),
            None => Ok(None),
        }
    }

    /// Abandons the current drag without changing the workflow.
    pub fn cancel_drag(&mut self) {
        self.drag = std::mem::take(&mut self.drag).cancel();
    }

    /// Validates and persists the working copy. Unsaved workflows are
    /// created, others updated. The stored result becomes both the original
    /// and the working copy.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the store rejects the write.
    #[instrument(skip(self, store), fields(workflow_id = %self.working.id))]
    pub async fn save(&mut self, store: &dyn WorkflowStore) -> Result<&Workflow, EditorError> {
        self.working
            .validate()
            .map_err(|e| EditorError::InvalidWorkflow {
                workflow_id: self.working.id.clone(),
                reason: e.to_string(),
            })?;

        let update = WorkflowUpdate::from(&self.working);
        let saved = if self.working.id.is_unsaved() {
            store.create_workflow(update).await
        } else {
            store.update_workflow(&self.working.id, update).await
        };
        let saved = saved.map_err(EditorError::from)?;

        info!(saved_id = %saved.id, version = saved.version, "workflow saved");
        self.original = saved.clone();
        self.working = saved;
        Ok(&self.working)
    }

    /// Replaces the working copy's steps, bumping `updated_at` on every step
    /// that changed. Steps that did not exist before keep their timestamps.
    fn replace_actions(&mut self, mut actions: Vec<Action>) {
        let before: HashMap<&ActionId, &Action> =
            self.working.actions.iter().map(|a| (&a.id, a)).collect();
        for action in &mut actions {
            if before.get(&action.id).is_some_and(|old| **old != *action) {
                action.touch(self.clock.as_ref());
            }
        }
        self.working = self.working.with_actions(actions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dropzone::Viewport;
    use flowcanvas_core::{FixedClock, SequentialIdGenerator};
    use flowcanvas_workflow::{ActionType, InMemoryWorkflowStore};
    use serde_json::json;

    const NOW: i64 = 1_700_000_000_000;

    fn session(workflow: Workflow) -> EditorSession {
        EditorSession::new(workflow, EditorConfig::default())
            .with_clock(Arc::new(FixedClock::from_millis(NOW)))
            .with_id_generator(Arc::new(SequentialIdGenerator::new()))
    }

    fn draft_edge(session: &EditorSession) -> VisualEdge {
        session
            .graph()
            .expect("graph")
            .edge("continue_trigger_node->exit_node")
            .cloned()
            .expect("draft edge")
    }

    #[tokio::test]
    async fn load_unsaved_opens_draft() {
        let store = InMemoryWorkflowStore::new();
        let session = EditorSession::load(&store, &WorkflowId::unsaved(), EditorConfig::default())
            .await
            .expect("load");

        assert_eq!(session.workflow(), &Workflow::new_draft());
        assert!(!session.is_dirty());
        assert_eq!(store.workflow_count().expect("count"), 0);
    }

    #[tokio::test]
    async fn load_existing_workflow_is_clean() {
        let store = InMemoryWorkflowStore::new();
        let mut stored = Workflow::new_draft().with_actions(vec![
            Action::new("trigger_node", ActionType::Trigger, "Trigger")
                .with_next("continue", "wait", None),
            Action::new("wait", ActionType::Delay, "Wait")
                .with_config(json!({ "delay_duration": "1d" }))
                .with_next("continue", "exit_node", None),
            Action::new("exit_node", ActionType::Exit, "Exit"),
        ]);
        stored.id = WorkflowId::from("wf_seeded");
        stored.name = "Seeded".to_string();
        store.seed(stored.clone()).expect("seed");

        let session = EditorSession::load(&store, &stored.id, EditorConfig::default())
            .await
            .expect("load");

        assert!(!session.is_dirty());
        assert_eq!(session.workflow(), &stored);
        assert_eq!(session.original(), &stored);
        assert_eq!(session.graph().expect("graph").nodes.len(), 3);
    }

    #[tokio::test]
    async fn load_missing_workflow_fails() {
        let store = InMemoryWorkflowStore::new();
        let result =
            EditorSession::load(&store, &WorkflowId::from("wf_missing"), EditorConfig::default())
                .await;
        assert!(result.is_err());
    }

    #[test]
    fn insert_touches_source_and_marks_dirty() {
        let mut session = session(Workflow::new_draft());
        let edge = draft_edge(&session);

        let action_id = session
            .insert(&ToolbarNode::new(ActionType::Delay), &edge)
            .expect("insert");

        assert_eq!(action_id.as_str(), "action_delay_0001");
        assert!(session.is_dirty());
        let trigger = session
            .workflow()
            .action(&ActionId::from("trigger_node"))
            .expect("trigger");
        assert_eq!(trigger.updated_at, NOW);
        let exit = session
            .workflow()
            .action(&ActionId::from("exit_node"))
            .expect("exit");
        assert_eq!(exit.updated_at, 0);
        assert_eq!(session.original().actions.len(), 2);
    }

    #[test]
    fn delete_refuses_anchor_steps() {
        let mut session = session(Workflow::new_draft());
        assert!(session.delete(&[ActionId::from("trigger_node")]).is_err());
        assert!(session.delete(&[ActionId::from("exit_node")]).is_err());
        assert!(session.delete(&[ActionId::from("ghost")]).is_err());
        assert!(!session.is_dirty());
    }

    #[test]
    fn insert_then_delete_restores_structure() {
        let mut session = session(Workflow::new_draft());
        let edge = draft_edge(&session);
        let action_id = session
            .insert(&ToolbarNode::new(ActionType::Message), &edge)
            .expect("insert");
        session.set_node_position(action_id.clone(), Point::new(0.0, 100.0));

        session.delete(&[action_id]).expect("delete");

        let graph = session.graph().expect("graph");
        let original = project(&Workflow::new_draft()).expect("project");
        let edge_ids = |g: &FlowGraph| g.edges.iter().map(|e| e.id.clone()).collect::<Vec<_>>();
        assert_eq!(edge_ids(&graph), edge_ids(&original));
        assert_eq!(graph.nodes.len(), 2);
    }

    #[test]
    fn set_input_updates_working_copy() {
        let mut session = session(Workflow::new_draft());
        session
            .set_input(&ActionId::from("exit_node"), "reason", json!("Converted"))
            .expect("set input");

        let exit = session
            .workflow()
            .action(&ActionId::from("exit_node"))
            .expect("exit");
        assert_eq!(exit.config_value("/reason"), Some(&json!("Converted")));
        assert_eq!(exit.updated_at, NOW);

        let before = session.workflow().clone();
        assert!(
            session
                .set_input(&ActionId::from("exit_node"), "colour", json!("red"))
                .is_err()
        );
        assert_eq!(session.workflow(), &before);
    }

    #[test]
    fn drag_and_drop_inserts_on_highlighted_edge() {
        let mut session = session(Workflow::new_draft());
        session.set_node_position(ActionId::from("exit_node"), Point::new(0.0, 300.0));
        session
            .begin_drag(ToolbarNode::new(ActionType::WaitUntilCondition))
            .expect("begin drag");
        assert_eq!(session.dropzones().len(), 1);

        // trigger bottom handle (50, 34), exit top handle (50, 300)
        let active = session
            .drag_over(Point::new(50.0, 167.0), &Viewport::default())
            .map(|d| d.edge.id.clone());
        assert_eq!(active.as_deref(), Some("continue_trigger_node->exit_node"));

        let inserted = session.drop_toolbar_item().expect("drop");
        assert_eq!(
            inserted.map(|id| id.to_string()).as_deref(),
            Some("action_wait_until_condition_0001")
        );
        assert!(!session.is_dragging());
        assert!(session.dropzones().is_empty());
        assert_eq!(session.workflow().actions.len(), 3);
    }

    #[test]
    fn cancelled_drag_leaves_workflow_unchanged() {
        let mut session = session(Workflow::new_draft());
        session
            .begin_drag(ToolbarNode::new(ActionType::Delay))
            .expect("begin drag");
        session.drag_over(Point::new(50.0, 17.0), &Viewport::default());
        session.cancel_drag();

        assert!(session.dropzones().is_empty());
        assert_eq!(session.drop_toolbar_item().expect("drop"), None);
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn save_creates_then_updates() {
        let store = InMemoryWorkflowStore::with_id_generator(SequentialIdGenerator::new());
        let mut session = session(Workflow::new_draft());
        let edge = draft_edge(&session);
        session
            .insert(&ToolbarNode::new(ActionType::Delay), &edge)
            .expect("insert");

        let created = session.save(&store).await.expect("create").clone();
        assert_eq!(created.id.as_str(), "wf_0001");
        assert_eq!(created.version, 1);
        assert!(!session.is_dirty());

        session
            .set_input(&ActionId::from("action_delay_0001"), "duration", json!("2h"))
            .expect("set input");
        let updated = session.save(&store).await.expect("update");
        assert_eq!(updated.id.as_str(), "wf_0001");
        assert_eq!(updated.version, 2);

        let stored = store
            .get_workflow(&WorkflowId::from("wf_0001"))
            .await
            .expect("stored");
        assert_eq!(stored.actions.len(), 3);
    }

    #[tokio::test]
    async fn save_rejects_invalid_workflow() {
        let store = InMemoryWorkflowStore::new();
        let broken = Workflow::new_draft().with_actions(vec![Action::new(
            "trigger_node",
            ActionType::Trigger,
            "",
        )
        .with_next("continue", "ghost", None)]);
        let mut session = session(broken);

        assert!(session.save(&store).await.is_err());
        assert!(session.workflow().id.is_unsaved());
        assert_eq!(store.workflow_count().expect("count"), 0);
    }
}
