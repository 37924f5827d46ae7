//! Per-type step behaviour.
//!
//! Every supported step type is a variant of [`ActionVariant`]. The variant
//! decides which handles a node exposes, which inputs the configuration form
//! shows, how those inputs map onto the step's `name` and `config`, and what a
//! freshly inserted step of that type looks like.
//!
//! All operations are pure: they borrow an [`Action`] and return new values.

use crate::error::EditError;
use crate::handle::{Handle, HandleSide};
use crate::input::{InputSchema, InputType, Inputs};
use crate::projection::VisualEdge;
use crate::toolbar::ToolbarNode;
use flowcanvas_core::{ActionId, Clock, IdGenerator};
use flowcanvas_workflow::{
    ABORT_BRANCH, Action, ActionType, CONTINUE_BRANCH, DEFAULT_EXIT_REASON, OnErrorBehavior,
    condition_branch, condition_index,
};
use serde_json::{Value as JsonValue, json};
use std::collections::BTreeSet;

const DEFAULT_DELAY_DURATION: &str = "1h";
const NEW_DELAY_DURATION: &str = "15s";
const NEW_MAX_WAIT_DURATION: &str = "300s";

/// A step type the editor knows how to render and edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionVariant {
    Trigger,
    Exit,
    Message,
    Delay,
    WaitUntilCondition,
    ConditionalBranch,
}

impl ActionVariant {
    /// Resolves the variant for a step type.
    ///
    /// # Errors
    ///
    /// `NotImplemented` for `function`, `UnsupportedActionType` for any type
    /// string this version does not recognise.
    pub fn for_type(action_type: &ActionType) -> Result<Self, EditError> {
        match action_type {
            ActionType::Trigger => Ok(Self::Trigger),
            ActionType::Exit => Ok(Self::Exit),
            ActionType::Message => Ok(Self::Message),
            ActionType::Delay => Ok(Self::Delay),
            ActionType::WaitUntilCondition => Ok(Self::WaitUntilCondition),
            ActionType::ConditionalBranch => Ok(Self::ConditionalBranch),
            ActionType::Function => Err(EditError::NotImplemented {
                action_type: action_type.to_string(),
            }),
            ActionType::Unknown(other) => Err(EditError::UnsupportedActionType {
                action_type: other.clone(),
            }),
        }
    }

    /// Resolves the variant of an existing step.
    ///
    /// # Errors
    ///
    /// See [`ActionVariant::for_type`].
    pub fn of(action: &Action) -> Result<Self, EditError> {
        Self::for_type(&action.action_type)
    }

    #[must_use]
    pub fn action_type(self) -> ActionType {
        match self {
            Self::Trigger => ActionType::Trigger,
            Self::Exit => ActionType::Exit,
            Self::Message => ActionType::Message,
            Self::Delay => ActionType::Delay,
            Self::WaitUntilCondition => ActionType::WaitUntilCondition,
            Self::ConditionalBranch => ActionType::ConditionalBranch,
        }
    }

    /// Trigger and exit anchor the workflow and cannot be removed.
    #[must_use]
    pub fn is_deletable(self) -> bool {
        !matches!(self, Self::Trigger | Self::Exit)
    }

    /// Connection points of `action`, in render order.
    #[must_use]
    pub fn handles(self, action: &Action) -> Vec<Handle> {
        let id = &action.id;
        match self {
            Self::Trigger => vec![Handle::source(CONTINUE_BRANCH, id, HandleSide::Bottom)],
            Self::Exit => vec![Handle::target(id)],
            Self::Message | Self::Delay => vec![
                Handle::target(id),
                Handle::source(CONTINUE_BRANCH, id, HandleSide::Bottom),
            ],
            Self::WaitUntilCondition => vec![
                Handle::target(id),
                Handle::source(CONTINUE_BRANCH, id, HandleSide::Left),
                Handle::source(ABORT_BRANCH, id, HandleSide::Right),
            ],
            Self::ConditionalBranch => {
                let mut handles = vec![Handle::target(id)];
                handles.extend(condition_indices(action).into_iter().map(|index| {
                    Handle::source(&condition_branch(index), id, HandleSide::Left)
                }));
                handles.push(Handle::source(CONTINUE_BRANCH, id, HandleSide::Right));
                handles
            }
        }
    }

    /// Editable inputs for steps of this type.
    #[must_use]
    pub fn inputs_schema(self) -> Vec<InputSchema> {
        let name = || InputSchema::new("name", "Name", InputType::String, false);
        match self {
            Self::Trigger => Vec::new(),
            Self::Exit => vec![
                InputSchema::new("reason", "Exit reason", InputType::String, false)
                    .with_default(json!(DEFAULT_EXIT_REASON))
                    .with_description("The reason for exiting the workflow"),
            ],
            Self::Message => vec![
                name(),
                InputSchema::new("email", "Email", InputType::Email, true),
            ],
            Self::Delay => vec![
                name(),
                InputSchema::new("duration", "Duration", InputType::String, true),
            ],
            Self::WaitUntilCondition => vec![
                name(),
                InputSchema::new("max_wait_duration", "Max wait duration", InputType::String, false)
                    .with_default(json!(NEW_MAX_WAIT_DURATION)),
            ],
            Self::ConditionalBranch => vec![name()],
        }
    }

    /// Current input values, with type defaults for anything unset.
    #[must_use]
    pub fn inputs(self, action: &Action) -> Inputs {
        let name = || ("name".to_string(), json!(action.name));
        let string_or = |pointer: &str, fallback: &str| {
            action
                .config_value(pointer)
                .filter(|value| !value.is_null())
                .cloned()
                .unwrap_or_else(|| json!(fallback))
        };

        match self {
            Self::Trigger => Inputs::new(),
            Self::Exit => Inputs::from([(
                "reason".to_string(),
                string_or("/reason", DEFAULT_EXIT_REASON),
            )]),
            Self::Message => Inputs::from([
                name(),
                (
                    "email".to_string(),
                    action
                        .config_value("/message/value")
                        .filter(|value| !value.is_null())
                        .cloned()
                        .unwrap_or_else(new_email_template),
                ),
            ]),
            Self::Delay => Inputs::from([
                name(),
                (
                    "duration".to_string(),
                    string_or("/delay_duration", DEFAULT_DELAY_DURATION),
                ),
            ]),
            Self::WaitUntilCondition => Inputs::from([
                name(),
                (
                    "max_wait_duration".to_string(),
                    string_or("/max_wait_duration", NEW_MAX_WAIT_DURATION),
                ),
            ]),
            Self::ConditionalBranch => Inputs::from([name()]),
        }
    }

    /// Returns a copy of `action` with input `key` set to `value`.
    ///
    /// # Errors
    ///
    /// `UnsupportedInputKey` when `key` is not in this type's schema,
    /// `InvalidInputValue` when `value` has the wrong JSON shape.
    pub fn set_input(self, action: &Action, key: &str, value: JsonValue) -> Result<Action, EditError> {
        if !self.inputs_schema().iter().any(|schema| schema.key == key) {
            return Err(EditError::UnsupportedInputKey {
                action_type: self.action_type().to_string(),
                key: key.to_string(),
            });
        }

        let mut updated = action.clone();
        match (self, key) {
            (_, "name") => updated.name = expect_string(key, value)?,
            (Self::Exit, "reason") => {
                updated.set_config_value(&["reason"], json!(expect_string(key, value)?));
            }
            (Self::Message, "email") => {
                if !value.is_object() {
                    return Err(EditError::InvalidInputValue {
                        key: key.to_string(),
                        expected: "object",
                    });
                }
                updated.set_config_value(&["message", "value"], value);
            }
            (Self::Delay, "duration") => {
                updated.set_config_value(&["delay_duration"], json!(expect_string(key, value)?));
            }
            (Self::WaitUntilCondition, "max_wait_duration") => {
                updated.set_config_value(&["max_wait_duration"], json!(expect_string(key, value)?));
            }
            _ => {
                return Err(EditError::UnsupportedInputKey {
                    action_type: self.action_type().to_string(),
                    key: key.to_string(),
                });
            }
        }
        Ok(updated)
    }

    /// Builds a fresh step of this type whose branches all lead to `target`.
    ///
    /// # Errors
    ///
    /// `UnsupportedActionType` for trigger and exit, which the toolbar never
    /// offers.
    pub fn new_action(
        self,
        target: &ActionId,
        ids: &dyn IdGenerator,
        clock: &dyn Clock,
    ) -> Result<Action, EditError> {
        let action_type = self.action_type();
        let id = ActionId::for_action_type(action_type.as_str(), ids);

        let action = match self {
            Self::Trigger | Self::Exit => {
                return Err(EditError::UnsupportedActionType {
                    action_type: action_type.to_string(),
                });
            }
            Self::Message => Action::new(id, action_type, "Message")
                .with_config(json!({
                    "message": { "value": new_email_template() },
                    "channel": "email",
                }))
                .with_next(CONTINUE_BRANCH, target.clone(), None),
            Self::Delay => Action::new(id, action_type, "Wait")
                .with_config(json!({ "delay_duration": NEW_DELAY_DURATION }))
                .with_next(CONTINUE_BRANCH, target.clone(), None),
            Self::WaitUntilCondition => Action::new(id, action_type, "Wait until...")
                .with_config(json!({
                    "condition": { "filter": null },
                    "max_wait_duration": NEW_MAX_WAIT_DURATION,
                }))
                .with_next(CONTINUE_BRANCH, target.clone(), None),
            Self::ConditionalBranch => Action::new(id, action_type, "Conditional")
                .with_config(json!({ "conditions": [] }))
                .with_next(condition_branch(0), target.clone(), Some("Match condition 1"))
                .with_next(CONTINUE_BRANCH, target.clone(), Some("No match")),
        };

        let now = clock.now_millis();
        Ok(Action {
            description: Some(Some(String::new())),
            on_error: Some(Some(OnErrorBehavior::Continue)),
            created_at: now,
            updated_at: now,
            ..action
        })
    }
}

/// Indices of a conditional step's conditions: every entry of
/// `config.conditions` plus any `condition_N` branch already wired up.
fn condition_indices(action: &Action) -> BTreeSet<usize> {
    let configured = action
        .config_value("/conditions")
        .and_then(JsonValue::as_array)
        .map_or(0, Vec::len);

    (0..configured)
        .chain(
            action
                .next_actions
                .iter()
                .filter_map(|(branch, _)| condition_index(branch)),
        )
        .collect()
}

fn expect_string(key: &str, value: JsonValue) -> Result<String, EditError> {
    match value {
        JsonValue::String(s) => Ok(s),
        _ => Err(EditError::InvalidInputValue {
            key: key.to_string(),
            expected: "string",
        }),
    }
}

/// The blank email template new message steps start from.
#[must_use]
pub fn new_email_template() -> JsonValue {
    json!({
        "subject": "",
        "text": "",
        "html": "",
        "design": null,
    })
}

/// Handles of `action`.
///
/// # Errors
///
/// Fails if the step type has no variant.
pub fn handles(action: &Action) -> Result<Vec<Handle>, EditError> {
    Ok(ActionVariant::of(action)?.handles(action))
}

/// Input schema of `action`.
///
/// # Errors
///
/// Fails if the step type has no variant.
pub fn inputs_schema(action: &Action) -> Result<Vec<InputSchema>, EditError> {
    Ok(ActionVariant::of(action)?.inputs_schema())
}

/// Current inputs of `action`.
///
/// # Errors
///
/// Fails if the step type has no variant.
pub fn inputs(action: &Action) -> Result<Inputs, EditError> {
    Ok(ActionVariant::of(action)?.inputs(action))
}

/// Returns a copy of `action` with one input changed.
///
/// # Errors
///
/// Fails if the step type has no variant or the key/value is rejected.
pub fn set_input(action: &Action, key: &str, value: JsonValue) -> Result<Action, EditError> {
    ActionVariant::of(action)?.set_input(action, key, value)
}

/// Builds the step a toolbar item creates when dropped onto `edge`.
///
/// The new step's branches point at the edge's current target.
///
/// # Errors
///
/// Fails if the toolbar item's type cannot be inserted.
pub fn from_toolbar_node(
    toolbar: &ToolbarNode,
    edge: &VisualEdge,
    ids: &dyn IdGenerator,
    clock: &dyn Clock,
) -> Result<Action, EditError> {
    ActionVariant::for_type(&toolbar.action_type)?.new_action(&edge.target, ids, clock)
}
