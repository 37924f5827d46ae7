//! Error types for the editor crate.
//!
//! - `EditError`: invariant violations raised by the pure engine functions
//!   (registry, projection, insertion, deletion)
//! - `EditorError`: session-level failures, reported through rootcause
//!
//! None of these are expected at runtime; they indicate a corrupted workflow
//! or a caller bug and are surfaced to the user as "could not apply change".

use flowcanvas_core::{ActionId, WorkflowId};
use flowcanvas_workflow::StoreError;
use std::fmt;

/// Errors from the editing engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// The step type is not known to the registry.
    UnsupportedActionType { action_type: String },
    /// The step type is known but has no editor support yet.
    NotImplemented { action_type: String },
    /// The input key is not part of the step type's schema.
    UnsupportedInputKey { action_type: String, key: String },
    /// The input value has the wrong JSON shape for its key.
    InvalidInputValue { key: String, expected: &'static str },
    /// The edge's source step is not in the workflow.
    DanglingEdgeSource { edge_id: String, source: ActionId },
    /// The edge's target step is not in the workflow.
    DanglingEdgeTarget { edge_id: String, target: ActionId },
    /// The edge's source step no longer has a branch to the edge's target.
    StaleEdge { edge_id: String },
    /// The workflow has no exit step to insert before.
    MissingExit,
    /// The step to insert reuses the id of an existing step.
    DuplicateActionId { action_id: ActionId },
    /// The step to insert does not lead (only) to the edge's target.
    MisdirectedAction { action_id: ActionId, target: ActionId },
    /// A step selected for deletion is not in the workflow.
    ActionNotFound { action_id: ActionId },
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedActionType { action_type } => {
                write!(f, "unsupported action type: {action_type}")
            }
            Self::NotImplemented { action_type } => {
                write!(f, "action type '{action_type}' is not implemented yet")
            }
            Self::UnsupportedInputKey { action_type, key } => {
                write!(f, "'{key}' is not an input of {action_type} actions")
            }
            Self::InvalidInputValue { key, expected } => {
                write!(f, "input '{key}' expects a {expected} value")
            }
            Self::DanglingEdgeSource { edge_id, source } => {
                write!(f, "edge {edge_id} starts at missing step {source}")
            }
            Self::DanglingEdgeTarget { edge_id, target } => {
                write!(f, "edge {edge_id} ends at missing step {target}")
            }
            Self::StaleEdge { edge_id } => {
                write!(f, "edge {edge_id} no longer exists on its source step")
            }
            Self::MissingExit => write!(f, "workflow has no exit step"),
            Self::DuplicateActionId { action_id } => {
                write!(f, "a step with id {action_id} already exists")
            }
            Self::MisdirectedAction { action_id, target } => {
                write!(f, "new step {action_id} must lead only to {target}")
            }
            Self::ActionNotFound { action_id } => write!(f, "step not found: {action_id}"),
        }
    }
}

impl std::error::Error for EditError {}

/// Errors from an [`EditorSession`](crate::EditorSession).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    /// The engine rejected an edit.
    ChangeRejected(EditError),
    /// Loading or saving failed at the storage boundary.
    Store(StoreError),
    /// The step is not in the working copy.
    UnknownAction { action_id: ActionId },
    /// Trigger and exit steps cannot be deleted.
    ProtectedAction { action_id: ActionId },
    /// The workflow failed structural validation before save.
    InvalidWorkflow { workflow_id: WorkflowId, reason: String },
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChangeRejected(e) => write!(f, "could not apply change: {e}"),
            Self::Store(e) => write!(f, "workflow storage error: {e}"),
            Self::UnknownAction { action_id } => write!(f, "unknown step: {action_id}"),
            Self::ProtectedAction { action_id } => {
                write!(f, "step {action_id} cannot be deleted")
            }
            Self::InvalidWorkflow {
                workflow_id,
                reason,
            } => {
                write!(f, "workflow {workflow_id} is invalid: {reason}")
            }
        }
    }
}

impl std::error::Error for EditorError {}

impl From<EditError> for EditorError {
    fn from(e: EditError) -> Self {
        Self::ChangeRejected(e)
    }
}

impl From<StoreError> for EditorError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}
