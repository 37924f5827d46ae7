//! Drag-to-insert: dropzone markers and the drag gesture state machine.
//!
//! When a toolbar item starts dragging, one [`Dropzone`] is placed at the
//! midpoint of every edge. Each pointer move probes a small square at the
//! pointer's canvas position; the first dropzone it hits is highlighted. A
//! drop on a highlighted dropzone yields a [`PendingInsertion`] for that
//! dropzone's edge. Dropzones exist only inside [`DragSession::Dragging`] and
//! are discarded with it.

use crate::config::{EditorConfig, ProbeConfig};
use crate::geometry::{Point, Rect, Size};
use crate::projection::{FlowGraph, VisualEdge, VisualNode};
use crate::toolbar::ToolbarNode;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maps pointer positions reported by the renderer into canvas space.
pub trait CanvasTransform {
    fn screen_to_canvas(&self, point: Point) -> Point;
}

/// Pan and zoom of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

impl CanvasTransform for Viewport {
    fn screen_to_canvas(&self, point: Point) -> Point {
        let zoom = if self.zoom > 0.0 { self.zoom } else { 1.0 };
        Point::new((point.x - self.x) / zoom, (point.y - self.y) / zoom)
    }
}

/// An insertion target drawn on an edge while dragging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dropzone {
    pub id: String,
    pub edge: VisualEdge,
    /// Top-left corner in canvas space.
    pub position: Point,
    pub size: Size,
    pub highlighted: bool,
}

impl Dropzone {
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::new(self.position, self.size)
    }
}

/// Id of the dropzone anchored on `edge`: `dropzone_edge_{edge id}`.
#[must_use]
pub fn dropzone_id(edge: &VisualEdge) -> String {
    format!("dropzone_edge_{}", edge.id)
}

/// Midpoint between the edge's source handle and target handle.
///
/// Returns `None` when either end is not a node of `graph`. A handle the node
/// does not expose anchors at the node's position.
#[must_use]
pub fn edge_midpoint(graph: &FlowGraph, edge: &VisualEdge, node_size: Size) -> Option<Point> {
    let source = graph.node(&edge.source)?;
    let target = graph.node(&edge.target)?;
    Some(
        handle_point(source, &edge.source_handle, node_size)
            .midpoint(handle_point(target, &edge.target_handle, node_size)),
    )
}

fn handle_point(node: &VisualNode, handle_id: &str, node_size: Size) -> Point {
    node.handle(handle_id)
        .map_or(node.position, |handle| node.position + handle.offset(node_size))
}

/// One dropzone per edge of `graph`, in edge order.
#[must_use]
pub fn build_dropzones(graph: &FlowGraph, config: &EditorConfig) -> Vec<Dropzone> {
    let size = config.node.size();
    graph
        .edges
        .iter()
        .filter_map(|edge| {
            let center = edge_midpoint(graph, edge, size)?;
            Some(Dropzone {
                id: dropzone_id(edge),
                edge: edge.clone(),
                position: Rect::centered_on(center, size).origin(),
                size,
                highlighted: false,
            })
        })
        .collect()
}

/// The square probe placed at a canvas position.
#[must_use]
pub fn probe_rect(at: Point, probe: &ProbeConfig) -> Rect {
    Rect::new(at, Size::new(probe.size, probe.size))
}

/// First dropzone hit by `probe`.
#[must_use]
pub fn find_intersecting<'a>(
    dropzones: &'a [Dropzone],
    probe: &Rect,
    allow_partial: bool,
) -> Option<&'a Dropzone> {
    dropzones
        .iter()
        .find(|dropzone| probe.hits(&dropzone.rect(), allow_partial))
}

/// An insertion the user confirmed by dropping on a dropzone.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingInsertion {
    pub toolbar: ToolbarNode,
    pub edge: VisualEdge,
}

/// State of an in-progress drag.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveDrag {
    pub toolbar: ToolbarNode,
    pub dropzones: Vec<Dropzone>,
    /// Id of the highlighted dropzone.
    pub active: Option<String>,
}

/// The drag gesture.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragSession {
    #[default]
    Idle,
    Dragging(ActiveDrag),
}

impl DragSession {
    /// Starts dragging `toolbar` over `graph`. Any drag already in progress is
    /// replaced.
    #[must_use]
    pub fn begin(toolbar: ToolbarNode, graph: &FlowGraph, config: &EditorConfig) -> Self {
        let dropzones = build_dropzones(graph, config);
        debug!(
            action_type = %toolbar.action_type,
            dropzones = dropzones.len(),
            "drag started"
        );
        Self::Dragging(ActiveDrag {
            toolbar,
            dropzones,
            active: None,
        })
    }

    /// Updates the highlighted dropzone for a pointer at `screen`.
    #[must_use]
    pub fn pointer_moved(
        self,
        screen: Point,
        canvas: &dyn CanvasTransform,
        probe: &ProbeConfig,
    ) -> Self {
        let Self::Dragging(mut drag) = self else {
            return Self::Idle;
        };

        let rect = probe_rect(canvas.screen_to_canvas(screen), probe);
        let active =
            find_intersecting(&drag.dropzones, &rect, probe.allow_partial).map(|d| d.id.clone());
        for dropzone in &mut drag.dropzones {
            dropzone.highlighted = active.as_deref() == Some(dropzone.id.as_str());
        }
        drag.active = active;
        Self::Dragging(drag)
    }

    /// Ends the gesture with a drop. All dropzones are discarded; the
    /// insertion is returned only if a dropzone was highlighted.
    #[must_use]
    pub fn finish(self) -> Option<PendingInsertion> {
        let Self::Dragging(drag) = self else {
            return None;
        };
        let ActiveDrag {
            toolbar,
            dropzones,
            active,
        } = drag;
        let active = active?;
        dropzones
            .into_iter()
            .find(|dropzone| dropzone.id == active)
            .map(|dropzone| PendingInsertion {
                toolbar,
                edge: dropzone.edge,
            })
    }

    /// Abandons the gesture.
    #[must_use]
    pub fn cancel(self) -> Self {
        if self.is_dragging() {
            debug!("drag cancelled");
        }
        Self::Idle
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self, Self::Dragging(_))
    }

    /// Current dropzones; empty when idle.
    #[must_use]
    pub fn dropzones(&self) -> &[Dropzone] {
        match self {
            Self::Idle => &[],
            Self::Dragging(drag) => &drag.dropzones,
        }
    }

    #[must_use]
    pub fn active_dropzone(&self) -> Option<&Dropzone> {
        let Self::Dragging(drag) = self else {
            return None;
        };
        let active = drag.active.as_deref()?;
        drag.dropzones.iter().find(|dropzone| dropzone.id == active)
    }
}
