//! Structural editing engine for flowcanvas workflows.
//!
//! This crate translates between a workflow definition and the node/edge graph
//! a canvas renders, and implements the edits the canvas offers:
//!
//! - **Registry**: per-type handles, input schemas and step factories
//!   (`ActionVariant`)
//! - **Projection**: workflow to `FlowGraph`, deterministic and side-effect free
//! - **Insertion**: splicing a new step into an existing connection
//! - **Deletion**: removing steps and reconnecting around them
//! - **Dropzones**: drag-to-insert hit-testing and the drag state machine
//! - **Session**: a working copy with load/save at the storage boundary

pub mod config;
pub mod delete;
pub mod dropzone;
pub mod error;
pub mod geometry;
pub mod handle;
pub mod input;
pub mod insert;
pub mod projection;
pub mod session;
pub mod toolbar;
pub mod variant;

pub use config::{EditorConfig, NodeConfig, ProbeConfig};
pub use delete::delete_actions;
pub use dropzone::{
    ActiveDrag, CanvasTransform, DragSession, Dropzone, PendingInsertion, Viewport,
    build_dropzones, dropzone_id, find_intersecting,
};
pub use error::{EditError, EditorError};
pub use geometry::{Point, Rect, Size};
pub use handle::{Handle, HandleRole, HandleSide};
pub use input::{InputSchema, InputType, Inputs};
pub use insert::{InsertionEngine, splice};
pub use projection::{FlowGraph, VisualEdge, VisualNode, edge_id, project};
pub use session::EditorSession;
pub use toolbar::ToolbarNode;
pub use variant::{ActionVariant, from_toolbar_node};
