//! Connection points ("handles") on rendered nodes.
//!
//! Handle ids are derived only from the branch (or role) and the step id, so
//! recomputing the handles of an unchanged step always yields the same ids.
//! Edges refer to handles by these ids.

use crate::geometry::{Point, Size};
use flowcanvas_core::ActionId;
use serde::{Deserialize, Serialize};

/// Whether edges leave or enter through a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleRole {
    Source,
    Target,
}

/// The side of the node a handle sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleSide {
    Top,
    Bottom,
    Left,
    Right,
}

/// A connection point on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handle {
    pub id: String,
    #[serde(rename = "type")]
    pub role: HandleRole,
    #[serde(rename = "position")]
    pub side: HandleSide,
}

impl Handle {
    /// The single incoming handle of a step, on its top edge.
    #[must_use]
    pub fn target(action_id: &ActionId) -> Self {
        Self {
            id: target_handle_id(action_id),
            role: HandleRole::Target,
            side: HandleSide::Top,
        }
    }

    /// An outgoing handle for `branch`.
    #[must_use]
    pub fn source(branch: &str, action_id: &ActionId, side: HandleSide) -> Self {
        Self {
            id: source_handle_id(branch, action_id),
            role: HandleRole::Source,
            side,
        }
    }

    /// Position of the handle relative to the node's top-left corner.
    #[must_use]
    pub fn offset(&self, node: Size) -> Point {
        match self.side {
            HandleSide::Top => Point::new(node.width / 2.0, 0.0),
            HandleSide::Bottom => Point::new(node.width / 2.0, node.height),
            HandleSide::Left => Point::new(0.0, node.height / 2.0),
            HandleSide::Right => Point::new(node.width, node.height / 2.0),
        }
    }
}

/// Id of the incoming handle of a step: `target_{id}`.
#[must_use]
pub fn target_handle_id(action_id: &ActionId) -> String {
    format!("target_{action_id}")
}

/// Id of the outgoing handle for a branch: `{branch}_{id}`.
#[must_use]
pub fn source_handle_id(branch: &str, action_id: &ActionId) -> String {
    format!("{branch}_{action_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_ids() {
        let id = ActionId::from("action_delay_1");
        assert_eq!(Handle::target(&id).id, "target_action_delay_1");
        assert_eq!(
            Handle::source("abort", &id, HandleSide::Right).id,
            "abort_action_delay_1"
        );
    }

    #[test]
    fn offsets_follow_side() {
        let size = Size::new(100.0, 40.0);
        let id = ActionId::from("a");
        assert_eq!(Handle::target(&id).offset(size), Point::new(50.0, 0.0));
        assert_eq!(
            Handle::source("continue", &id, HandleSide::Bottom).offset(size),
            Point::new(50.0, 40.0)
        );
        assert_eq!(
            Handle::source("continue", &id, HandleSide::Left).offset(size),
            Point::new(0.0, 20.0)
        );
        assert_eq!(
            Handle::source("abort", &id, HandleSide::Right).offset(size),
            Point::new(100.0, 20.0)
        );
    }

    #[test]
    fn handle_serializes_for_renderer() {
        let json = serde_json::to_value(Handle::target(&ActionId::from("x"))).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({ "id": "target_x", "type": "target", "position": "top" })
        );
    }
}
