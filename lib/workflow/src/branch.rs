//! Outgoing connections of a step.
//!
//! `next_actions` is persisted as a JSON object whose key order is
//! meaningful: it is the order in which the editor projects edges. The map is
//! therefore stored as an ordered list of `(branch, target)` pairs with a
//! custom serde impl that reads and writes a plain JSON object.

use flowcanvas_core::ActionId;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The branch every step type uses for its default successor.
pub const CONTINUE_BRANCH: &str = "continue";

/// The branch a `wait_until_condition` step takes when it times out.
pub const ABORT_BRANCH: &str = "abort";

/// Prefix of the per-condition branches of a `conditional_branch` step.
pub const CONDITION_BRANCH_PREFIX: &str = "condition_";

/// Returns the branch name for the condition at `index` (`condition_{index}`).
#[must_use]
pub fn condition_branch(index: usize) -> String {
    format!("{CONDITION_BRANCH_PREFIX}{index}")
}

/// Parses the index out of a `condition_{index}` branch name.
#[must_use]
pub fn condition_index(branch: &str) -> Option<usize> {
    branch.strip_prefix(CONDITION_BRANCH_PREFIX)?.parse().ok()
}

/// A single outgoing connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextAction {
    /// The step this branch leads to.
    pub action_id: ActionId,
    /// Optional display label (e.g. "Match condition 1").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl NextAction {
    /// Creates a connection to `target` with an optional label.
    #[must_use]
    pub fn new(target: impl Into<ActionId>, label: Option<&str>) -> Self {
        Self {
            action_id: target.into(),
            label: label.map(str::to_string),
        }
    }
}

/// Ordered branch map of a step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NextActions(Vec<(String, NextAction)>);

impl NextActions {
    /// Creates an empty branch map.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Returns the connection for `branch`, if any.
    #[must_use]
    pub fn get(&self, branch: &str) -> Option<&NextAction> {
        self.0.iter().find(|(b, _)| b == branch).map(|(_, next)| next)
    }

    /// Sets the connection for `branch`.
    ///
    /// An existing branch keeps its position; a new branch is appended.
    pub fn insert(&mut self, branch: impl Into<String>, next: NextAction) {
        let branch = branch.into();
        match self.0.iter().position(|(b, _)| *b == branch) {
            Some(index) => self.0[index].1 = next,
            None => self.0.push((branch, next)),
        }
    }

    /// Iterates connections in persisted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &NextAction)> {
        self.0.iter().map(|(b, next)| (b.as_str(), next))
    }

    /// Iterates connections mutably in persisted order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut NextAction)> {
        self.0.iter_mut().map(|(b, next)| (b.as_str(), next))
    }

    /// Returns the `continue` connection, if any.
    #[must_use]
    pub fn continue_action(&self) -> Option<&NextAction> {
        self.get(CONTINUE_BRANCH)
    }

    /// Number of outgoing connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the step has no outgoing connections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for NextActions {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (branch, next) in &self.0 {
            map.serialize_entry(branch, next)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for NextActions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct NextActionsVisitor;

        impl<'de> Visitor<'de> for NextActionsVisitor {
            type Value = NextActions;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of branch names to next actions")
            }

            fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut next_actions = NextActions::new();
                while let Some((branch, next)) = access.next_entry::<String, NextAction>()? {
                    next_actions.insert(branch, next);
                }
                Ok(next_actions)
            }
        }

        deserializer.deserialize_map(NextActionsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_preserves_key_order() {
        let json = r#"{
            "continue": { "action_id": "b", "label": "No match" },
            "condition_1": { "action_id": "c" },
            "condition_0": { "action_id": "a", "label": "Match condition 1" }
        }"#;
        let parsed: NextActions = serde_json::from_str(json).expect("deserialize");
        let branches: Vec<_> = parsed.iter().map(|(b, _)| b).collect();
        assert_eq!(branches, vec!["continue", "condition_1", "condition_0"]);

        let written = serde_json::to_string(&parsed).expect("serialize");
        assert!(written.find("continue") < written.find("condition_1"));
        assert!(written.find("condition_1") < written.find("condition_0"));
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut next = NextActions::new();
        next.insert("condition_0", NextAction::new("a", None));
        next.insert("continue", NextAction::new("b", None));
        next.insert("condition_0", NextAction::new("c", Some("Match")));

        let pairs: Vec<_> = next
            .iter()
            .map(|(b, n)| (b.to_string(), n.action_id.to_string()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("condition_0".to_string(), "c".to_string()),
                ("continue".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn condition_branch_names() {
        assert_eq!(condition_branch(2), "condition_2");
        assert_eq!(condition_index("condition_2"), Some(2));
        assert_eq!(condition_index("continue"), None);
        assert_eq!(condition_index("condition_x"), None);
    }
}
