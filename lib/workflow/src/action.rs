//! Workflow steps ("actions").
//!
//! An action is one node of a workflow's execution graph. Its outgoing
//! connections live in `next_actions`, keyed by branch name. The JSON shape
//! is the storage format, so fields this crate does not model are kept in
//! [`Action::extra`] and written back untouched.

use crate::branch::NextActions;
use flowcanvas_core::{ActionId, Clock};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// The kind of a workflow step.
///
/// Unrecognised type strings are kept as [`ActionType::Unknown`] so that a
/// workflow written by a newer editor still loads; the editor registry
/// rejects them when it tries to build a variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionType {
    /// Entry point of the workflow.
    Trigger,
    /// Terminal step.
    Exit,
    /// Sends a message.
    Message,
    /// Waits for a fixed duration.
    Delay,
    /// Waits until a condition matches or a timeout elapses.
    WaitUntilCondition,
    /// Routes to one of several branches.
    ConditionalBranch,
    /// Runs a function.
    Function,
    /// A type string this version does not know.
    Unknown(String),
}

impl ActionType {
    /// Returns the persisted string for this type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Trigger => "trigger",
            Self::Exit => "exit",
            Self::Message => "message",
            Self::Delay => "delay",
            Self::WaitUntilCondition => "wait_until_condition",
            Self::ConditionalBranch => "conditional_branch",
            Self::Function => "function",
            Self::Unknown(other) => other,
        }
    }
}

impl From<&str> for ActionType {
    fn from(value: &str) -> Self {
        match value {
            "trigger" => Self::Trigger,
            "exit" => Self::Exit,
            "message" => Self::Message,
            "delay" => Self::Delay,
            "wait_until_condition" => Self::WaitUntilCondition,
            "conditional_branch" => Self::ConditionalBranch,
            "function" => Self::Function,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ActionType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActionType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

/// What the runtime does when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnErrorBehavior {
    /// Follow the `continue` branch.
    Continue,
    /// Stop the run.
    Abort,
    /// Mark the run complete.
    Complete,
    /// Follow a dedicated error branch.
    Branch,
}

/// A single workflow step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Unique, stable identifier within the workflow.
    pub id: ActionId,
    /// The step type.
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Free-form description. The outer `None` means the key was absent,
    /// `Some(None)` means it was an explicit `null`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    /// Type-specific payload. An explicit `null` is kept as
    /// `Some(JsonValue::Null)`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub config: Option<JsonValue>,
    /// Failure behaviour, absent/`null` kept apart like `description`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub on_error: Option<Option<OnErrorBehavior>>,
    /// Creation time, epoch milliseconds.
    #[serde(default)]
    pub created_at: i64,
    /// Last modification time, epoch milliseconds.
    #[serde(default)]
    pub updated_at: i64,
    /// Outgoing connections keyed by branch name.
    #[serde(default)]
    pub next_actions: NextActions,
    /// Fields not modelled here, preserved across round trips.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Action {
    /// Creates a step with no config and no outgoing connections.
    #[must_use]
    pub fn new(id: impl Into<ActionId>, action_type: ActionType, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            action_type,
            name: name.into(),
            description: None,
            config: None,
            on_error: None,
            created_at: 0,
            updated_at: 0,
            next_actions: NextActions::new(),
            extra: Map::new(),
        }
    }

    /// Sets the config payload.
    #[must_use]
    pub fn with_config(mut self, config: JsonValue) -> Self {
        self.config = Some(config);
        self
    }

    /// Adds (or replaces) an outgoing connection.
    #[must_use]
    pub fn with_next(
        mut self,
        branch: impl Into<String>,
        target: impl Into<ActionId>,
        label: Option<&str>,
    ) -> Self {
        self.next_actions
            .insert(branch, crate::branch::NextAction::new(target, label));
        self
    }

    /// Looks up a config value by JSON pointer (e.g. `/message/value`).
    #[must_use]
    pub fn config_value(&self, pointer: &str) -> Option<&JsonValue> {
        self.config.as_ref()?.pointer(pointer)
    }

    /// Writes a config value at a nested object path, creating intermediate
    /// objects as needed. Non-object intermediates are replaced.
    pub fn set_config_value(&mut self, path: &[&str], value: JsonValue) {
        if path.is_empty() {
            return;
        }
        write_path(self.config.get_or_insert(JsonValue::Null), path, value);
    }

    /// Bumps `updated_at` to the clock's current time.
    pub fn touch(&mut self, clock: &dyn Clock) {
        self.updated_at = clock.now_millis();
    }

    /// Returns true if any branch of this step points at `target`.
    #[must_use]
    pub fn points_to(&self, target: &ActionId) -> bool {
        self.next_actions.iter().any(|(_, next)| &next.action_id == target)
    }
}

/// Deserializes a field that is present in the input, so that together with
/// `#[serde(default)]` an absent key stays `None` while `null` becomes
/// `Some(..)`.
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn write_path(value: &mut JsonValue, path: &[&str], leaf: JsonValue) {
    let Some((head, rest)) = path.split_first() else {
        *value = leaf;
        return;
    };
    if !value.is_object() {
        *value = JsonValue::Object(Map::new());
    }
    if let JsonValue::Object(map) = value {
        let child = map.entry(head.to_string()).or_insert(JsonValue::Null);
        write_path(child, rest, leaf);
    }
}
