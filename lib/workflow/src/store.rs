//! Persistence boundary for workflow definitions.
//!
//! The editor only talks to storage at explicit load and save points. The
//! trait mirrors the HTTP API the editor is deployed against; the in-memory
//! implementation backs tests and offline tooling.

use crate::definition::{Workflow, WorkflowUpdate};
use crate::error::StoreError;
use async_trait::async_trait;
use flowcanvas_core::{IdGenerator, UlidGenerator, WorkflowId};
use std::collections::HashMap;
use std::sync::Mutex;

/// Load/save operations for workflow definitions.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Loads a workflow by id.
    async fn get_workflow(&self, id: &WorkflowId) -> Result<Workflow, StoreError>;

    /// Creates a workflow from a partial definition and returns the stored value.
    async fn create_workflow(&self, draft: WorkflowUpdate) -> Result<Workflow, StoreError>;

    /// Applies a partial update and returns the stored value.
    async fn update_workflow(
        &self,
        id: &WorkflowId,
        update: WorkflowUpdate,
    ) -> Result<Workflow, StoreError>;
}

/// A process-local store.
///
/// Updates are last-write-wins; every update bumps `version`.
pub struct InMemoryWorkflowStore {
    workflows: Mutex<HashMap<WorkflowId, Workflow>>,
    ids: Box<dyn IdGenerator>,
}

impl InMemoryWorkflowStore {
    /// Creates an empty store minting ULID-based workflow ids.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id_generator(UlidGenerator)
    }

    /// Creates an empty store minting ids from `ids`.
    #[must_use]
    pub fn with_id_generator(ids: impl IdGenerator + 'static) -> Self {
        Self {
            workflows: Mutex::new(HashMap::new()),
            ids: Box::new(ids),
        }
    }

    /// Inserts or replaces a workflow as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if the store's lock is poisoned.
    pub fn seed(&self, workflow: Workflow) -> Result<(), StoreError> {
        self.lock()?.insert(workflow.id.clone(), workflow);
        Ok(())
    }

    /// Number of stored workflows.
    ///
    /// # Errors
    ///
    /// Returns an error if the store's lock is poisoned.
    pub fn workflow_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<WorkflowId, Workflow>>, StoreError> {
        self.workflows.lock().map_err(|_| StoreError::StorageFailed {
            reason: "workflow store lock poisoned".to_string(),
        })
    }
}

impl Default for InMemoryWorkflowStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn get_workflow(&self, id: &WorkflowId) -> Result<Workflow, StoreError> {
        self.lock()?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                workflow_id: id.clone(),
            })
    }

    async fn create_workflow(&self, draft: WorkflowUpdate) -> Result<Workflow, StoreError> {
        let mut workflow = Workflow::new_draft();
        draft.apply_to(&mut workflow);
        workflow.id = WorkflowId::generate(self.ids.as_ref());
        workflow.version = 1;

        self.lock()?.insert(workflow.id.clone(), workflow.clone());
        Ok(workflow)
    }

    async fn update_workflow(
        &self,
        id: &WorkflowId,
        update: WorkflowUpdate,
    ) -> Result<Workflow, StoreError> {
        let mut workflows = self.lock()?;
        let workflow = workflows.get_mut(id).ok_or_else(|| StoreError::NotFound {
            workflow_id: id.clone(),
        })?;
        update.apply_to(workflow);
        workflow.version += 1;
        Ok(workflow.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcanvas_core::SequentialIdGenerator;

    #[tokio::test]
    async fn create_assigns_id_and_version() {
        let store = InMemoryWorkflowStore::with_id_generator(SequentialIdGenerator::new());
        let created = store
            .create_workflow(WorkflowUpdate {
                name: Some("Welcome".to_string()),
                ..Default::default()
            })
            .await
            .expect("create");

        assert_eq!(created.id, WorkflowId::from("wf_0001"));
        assert_eq!(created.version, 1);
        assert_eq!(created.name, "Welcome");
        assert_eq!(store.workflow_count().expect("count"), 1);
    }

    #[tokio::test]
    async fn create_keeps_team_and_unknown_fields() {
        let store = InMemoryWorkflowStore::with_id_generator(SequentialIdGenerator::new());
        let mut draft = Workflow::new_draft();
        draft.team_id = 7;
        draft
            .extra
            .insert("stop_type".to_string(), serde_json::json!("trigger"));

        let created = store
            .create_workflow(WorkflowUpdate::from(&draft))
            .await
            .expect("create");

        assert_eq!(created.team_id, 7);
        assert_eq!(created.extra.get("stop_type"), Some(&serde_json::json!("trigger")));
        assert_eq!(created.actions, draft.actions);
    }

    #[tokio::test]
    async fn update_bumps_version_last_write_wins() {
        let store = InMemoryWorkflowStore::with_id_generator(SequentialIdGenerator::new());
        let created = store
            .create_workflow(WorkflowUpdate::default())
            .await
            .expect("create");

        for name in ["first", "second"] {
            store
                .update_workflow(
                    &created.id,
                    WorkflowUpdate {
                        name: Some(name.to_string()),
                        ..Default::default()
                    },
                )
                .await
                .expect("update");
        }

        let loaded = store.get_workflow(&created.id).await.expect("get");
        assert_eq!(loaded.name, "second");
        assert_eq!(loaded.version, 3);
    }

    #[tokio::test]
    async fn missing_workflow_is_not_found() {
        let store = InMemoryWorkflowStore::new();
        let id = WorkflowId::from("wf_missing");
        let err = store.get_workflow(&id).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound { workflow_id: id });
    }
}
