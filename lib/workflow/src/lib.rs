//! Workflow model for flowcanvas.
//!
//! This crate provides the persisted shape of a workflow and the structural
//! checks the editor relies on:
//!
//! - **Steps**: `Action` values typed by `ActionType`, connected through
//!   ordered `next_actions` branch maps
//! - **Definition**: the `Workflow` document with lossless JSON round trips
//! - **Graph view**: petgraph-backed validation and reachability
//! - **Storage**: the async `WorkflowStore` boundary

pub mod action;
pub mod branch;
pub mod definition;
pub mod error;
pub mod graph;
pub mod store;

pub use action::{Action, ActionType, OnErrorBehavior};
pub use branch::{
    ABORT_BRANCH, CONDITION_BRANCH_PREFIX, CONTINUE_BRANCH, NextAction, NextActions,
    condition_branch, condition_index,
};
pub use definition::{
    Conversion, DEFAULT_EXIT_REASON, DRAFT_EXIT_ID, DRAFT_TRIGGER_ID, ExitCondition,
    TriggerMasking, Workflow, WorkflowStatus, WorkflowUpdate,
};
pub use error::{StoreError, ValidationError};
pub use graph::ActionGraph;
pub use store::{InMemoryWorkflowStore, WorkflowStore};
