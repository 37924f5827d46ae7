//! Strongly-typed ID types for workflow entities.
//!
//! Persisted ids are plain strings: hand-authored workflows use readable ids
//! such as `trigger_node`, while ids minted by the editor take the form
//! `{prefix}_{unique}` where the unique part comes from an [`IdGenerator`].

use crate::clock::IdGenerator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to generate a strongly-typed, string-backed ID wrapper.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an existing id string without validation.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns the prefix of ids minted by the editor.
            #[must_use]
            pub const fn prefix() -> &'static str {
                $prefix
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.is_empty() {
                    return Err(ParseIdError {
                        id_type: stringify!($name),
                        reason: "id is empty".to_string(),
                    });
                }
                if s.chars().any(char::is_whitespace) {
                    return Err(ParseIdError {
                        id_type: stringify!($name),
                        reason: format!("id '{s}' contains whitespace"),
                    });
                }
                Ok(Self(s.to_string()))
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for a step (action) within a workflow.
    ActionId,
    "action"
);

define_id!(
    /// Unique identifier for a workflow definition.
    WorkflowId,
    "wf"
);

impl ActionId {
    /// Mints an id for a new step of the given type: `action_{type}_{unique}`.
    #[must_use]
    pub fn for_action_type(action_type: &str, ids: &dyn IdGenerator) -> Self {
        Self(format!("{}_{action_type}_{}", Self::prefix(), ids.next_id()))
    }
}

impl WorkflowId {
    /// Sentinel id carried by a workflow that has never been saved.
    pub const UNSAVED: &'static str = "new";

    /// Mints a fresh id for a newly stored workflow: `wf_{unique}`.
    #[must_use]
    pub fn generate(ids: &dyn IdGenerator) -> Self {
        Self(format!("{}_{}", Self::prefix(), ids.next_id()))
    }

    /// Returns the id of a workflow that has not been persisted yet.
    #[must_use]
    pub fn unsaved() -> Self {
        Self(Self::UNSAVED.to_string())
    }

    /// Returns true if this id marks an unsaved workflow.
    #[must_use]
    pub fn is_unsaved(&self) -> bool {
        self.0 == Self::UNSAVED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SequentialIdGenerator;

    #[test]
    fn action_id_for_type_format() {
        let ids = SequentialIdGenerator::new();
        let id = ActionId::for_action_type("delay", &ids);
        assert_eq!(id.as_str(), "action_delay_0001");
    }

    #[test]
    fn generated_workflow_id_uses_prefix() {
        let ids = SequentialIdGenerator::new();
        let id = WorkflowId::generate(&ids);
        assert_eq!(id.as_str(), "wf_0001");
    }

    #[test]
    fn parse_rejects_empty_and_whitespace() {
        let empty: Result<ActionId, _> = "".parse();
        let err = empty.unwrap_err();
        assert_eq!(err.id_type, "ActionId");

        let spaced: Result<ActionId, _> = "exit node".parse();
        assert!(spaced.is_err());
    }

    #[test]
    fn parse_accepts_readable_ids() {
        let id: ActionId = "trigger_node".parse().expect("should parse");
        assert_eq!(id, ActionId::from("trigger_node"));
    }

    #[test]
    fn unsaved_workflow_id() {
        assert!(WorkflowId::unsaved().is_unsaved());
        assert!(!WorkflowId::from("wf_123").is_unsaved());
    }

    #[test]
    fn id_serde_is_transparent() {
        let id = ActionId::from("exit_node");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"exit_node\"");
        let parsed: ActionId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, parsed);
    }
}
