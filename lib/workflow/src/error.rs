//! Error types for the workflow crate.
//!
//! - `ValidationError`: structural problems in a workflow definition
//! - `StoreError`: failures at the persistence boundary
//!
//! Callers in higher layers convert these into their own report context.

use flowcanvas_core::{ActionId, WorkflowId};
use std::fmt;

/// Structural problems found by [`Workflow::validate`](crate::Workflow::validate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No step has type `trigger`.
    MissingTrigger,
    /// More than one step has type `trigger`.
    MultipleTriggers { count: usize },
    /// No step has type `exit`.
    MissingExit,
    /// More than one step has type `exit`.
    MultipleExits { count: usize },
    /// Two steps share an id.
    DuplicateActionId { action_id: ActionId },
    /// A branch points at a step that does not exist.
    DanglingReference {
        source: ActionId,
        branch: String,
        target: ActionId,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTrigger => write!(f, "workflow has no trigger step"),
            Self::MultipleTriggers { count } => {
                write!(f, "workflow has {count} trigger steps, expected exactly one")
            }
            Self::MissingExit => write!(f, "workflow has no exit step"),
            Self::MultipleExits { count } => {
                write!(f, "workflow has {count} exit steps, expected exactly one")
            }
            Self::DuplicateActionId { action_id } => {
                write!(f, "duplicate step id: {action_id}")
            }
            Self::DanglingReference {
                source,
                branch,
                target,
            } => {
                write!(
                    f,
                    "branch '{branch}' of step {source} points at missing step {target}"
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors from a [`WorkflowStore`](crate::WorkflowStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No workflow with this id exists.
    NotFound { workflow_id: WorkflowId },
    /// The backing storage failed.
    StorageFailed { reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { workflow_id } => write!(f, "workflow not found: {workflow_id}"),
            Self::StorageFailed { reason } => write!(f, "workflow storage failed: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}
