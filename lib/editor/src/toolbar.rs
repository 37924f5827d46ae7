//! Items offered by the step toolbar.

use flowcanvas_workflow::ActionType;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A toolbar entry that can be dragged onto the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolbarNode {
    /// The step type the item creates.
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// Presentation data owned by the toolbar (icon, caption, ...).
    #[serde(default)]
    pub metadata: JsonValue,
}

impl ToolbarNode {
    #[must_use]
    pub fn new(action_type: ActionType) -> Self {
        Self {
            action_type,
            metadata: JsonValue::Null,
        }
    }
}
