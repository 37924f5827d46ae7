//! Workflow definition types.
//!
//! A workflow is an ordered list of steps plus the settings that govern when
//! people enter and leave it. The step list is the single source of truth for
//! the step graph; every visual representation is rebuilt from it.

use crate::action::{Action, ActionType, present};
use crate::branch::CONTINUE_BRANCH;
use crate::error::ValidationError;
use crate::graph::ActionGraph;
use flowcanvas_core::{ActionId, WorkflowId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use std::collections::HashSet;

/// Id of the trigger step in a freshly created workflow.
pub const DRAFT_TRIGGER_ID: &str = "trigger_node";

/// Id of the exit step in a freshly created workflow.
pub const DRAFT_EXIT_ID: &str = "exit_node";

/// Default reason recorded on exit steps.
pub const DEFAULT_EXIT_REASON: &str = "Default exit";

/// Lifecycle status of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

/// When a person leaves the workflow early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitCondition {
    /// Only by reaching the exit step.
    #[default]
    ExitOnlyAtEnd,
    /// As soon as the conversion goal is met.
    ExitOnConversion,
    /// When the person stops matching the trigger filters.
    ExitOnTriggerNotMatched,
    /// Either of the two above.
    ExitOnTriggerNotMatchedOrConversion,
}

/// Rate limiting of repeated entries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TriggerMasking {
    /// Seconds an entry hash stays masked.
    #[serde(default)]
    pub ttl: i64,
    /// Template producing the entry hash.
    #[serde(default)]
    pub hash: String,
    /// Number of entries allowed within the ttl.
    #[serde(default)]
    pub threshold: i64,
}

/// Conversion goal tracking.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Conversion {
    /// Window in which a conversion counts.
    #[serde(default)]
    pub window_minutes: i64,
    /// Filters defining a conversion.
    #[serde(default)]
    pub filters: Vec<JsonValue>,
}

fn default_version() -> u32 {
    1
}

/// A complete workflow definition, in its persisted shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique identifier (`new` until first saved).
    pub id: WorkflowId,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Optional description. `Some(None)` records an explicit `null`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    /// The steps. Conventionally trigger first and exit last, but lookups go by id.
    pub actions: Vec<Action>,
    /// Entry trigger definition (opaque to the editor engine).
    #[serde(default)]
    pub trigger: JsonValue,
    /// Entry rate limiting.
    #[serde(default)]
    pub trigger_masking: TriggerMasking,
    /// Conversion goal.
    #[serde(default)]
    pub conversion: Conversion,
    /// Early-exit policy.
    #[serde(default)]
    pub exit_condition: ExitCondition,
    /// Monotonic version, bumped by the store on every update.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Lifecycle status.
    #[serde(default)]
    pub status: WorkflowStatus,
    /// Owning team.
    #[serde(default)]
    pub team_id: i64,
    /// Fields not modelled here, preserved across round trips.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Workflow {
    /// Creates the blank workflow the editor opens for an unsaved workflow:
    /// a trigger step connected straight to an exit step.
    #[must_use]
    pub fn new_draft() -> Self {
        let trigger = Action::new(DRAFT_TRIGGER_ID, ActionType::Trigger, "Trigger").with_next(
            CONTINUE_BRANCH,
            DRAFT_EXIT_ID,
            None,
        );
        let exit = Action::new(DRAFT_EXIT_ID, ActionType::Exit, "Exit")
            .with_config(json!({ "reason": DEFAULT_EXIT_REASON }));

        Self {
            id: WorkflowId::unsaved(),
            name: String::new(),
            description: None,
            actions: vec![trigger, exit],
            trigger: json!({ "type": "event" }),
            trigger_masking: TriggerMasking::default(),
            conversion: Conversion::default(),
            exit_condition: ExitCondition::default(),
            version: 1,
            status: WorkflowStatus::Draft,
            team_id: -1,
            extra: Map::new(),
        }
    }

    /// Returns a copy of this workflow with its steps replaced.
    #[must_use]
    pub fn with_actions(&self, actions: Vec<Action>) -> Self {
        Self {
            actions,
            ..self.clone()
        }
    }

    /// Returns the step with the given id.
    #[must_use]
    pub fn action(&self, id: &ActionId) -> Option<&Action> {
        self.actions.iter().find(|a| &a.id == id)
    }

    /// Returns the first step of the given type.
    #[must_use]
    pub fn first_of_type(&self, action_type: &ActionType) -> Option<&Action> {
        self.actions.iter().find(|a| &a.action_type == action_type)
    }

    /// Total number of outgoing connections across all steps.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.actions.iter().map(|a| a.next_actions.len()).sum()
    }

    /// Validates the structural invariants of the step graph.
    ///
    /// # Errors
    ///
    /// Returns the first violation found: trigger/exit cardinality, duplicate
    /// ids, then dangling references.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let triggers = self.count_of_type(&ActionType::Trigger);
        match triggers {
            0 => return Err(ValidationError::MissingTrigger),
            1 => {}
            count => return Err(ValidationError::MultipleTriggers { count }),
        }

        let exits = self.count_of_type(&ActionType::Exit);
        match exits {
            0 => return Err(ValidationError::MissingExit),
            1 => {}
            count => return Err(ValidationError::MultipleExits { count }),
        }

        let mut seen = HashSet::new();
        for action in &self.actions {
            if !seen.insert(&action.id) {
                return Err(ValidationError::DuplicateActionId {
                    action_id: action.id.clone(),
                });
            }
        }

        ActionGraph::from_workflow(self).map(|_| ())
    }

    /// Returns the ids of every step reachable from the trigger, including
    /// the trigger itself. Empty if there is no trigger.
    ///
    /// # Errors
    ///
    /// Returns an error if a branch points at a missing step.
    pub fn reachable_from_trigger(&self) -> Result<HashSet<ActionId>, ValidationError> {
        let Some(trigger) = self.first_of_type(&ActionType::Trigger) else {
            return Ok(HashSet::new());
        };
        let graph = ActionGraph::from_workflow(self)?;
        Ok(graph.reachable_from(&trigger.id))
    }

    fn count_of_type(&self, action_type: &ActionType) -> usize {
        self.actions
            .iter()
            .filter(|a| &a.action_type == action_type)
            .count()
    }
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new_draft()
    }
}

/// A partial workflow, as sent to the persistence API on create/update.
///
/// `None` fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkflowUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<Action>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_masking: Option<TriggerMasking>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion: Option<Conversion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_condition: Option<ExitCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkflowStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<i64>,
    /// Unmodelled workflow fields, merged over the stored ones.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl WorkflowUpdate {
    /// Applies the set fields onto `workflow`.
    pub fn apply_to(self, workflow: &mut Workflow) {
        if let Some(name) = self.name {
            workflow.name = name;
        }
        if let Some(description) = self.description {
            workflow.description = Some(description);
        }
        if let Some(team_id) = self.team_id {
            workflow.team_id = team_id;
        }
        workflow.extra.extend(self.extra);
        if let Some(actions) = self.actions {
            workflow.actions = actions;
        }
        if let Some(trigger) = self.trigger {
            workflow.trigger = trigger;
        }
        if let Some(trigger_masking) = self.trigger_masking {
            workflow.trigger_masking = trigger_masking;
        }
        if let Some(conversion) = self.conversion {
            workflow.conversion = conversion;
        }
        if let Some(exit_condition) = self.exit_condition {
            workflow.exit_condition = exit_condition;
        }
        if let Some(status) = self.status {
            workflow.status = status;
        }
    }
}

impl From<&Workflow> for WorkflowUpdate {
    fn from(workflow: &Workflow) -> Self {
        Self {
            name: Some(workflow.name.clone()),
            description: workflow.description.clone(),
            actions: Some(workflow.actions.clone()),
            trigger: Some(workflow.trigger.clone()),
            trigger_masking: Some(workflow.trigger_masking.clone()),
            conversion: Some(workflow.conversion.clone()),
            exit_condition: Some(workflow.exit_condition),
            status: Some(workflow.status),
            team_id: Some(workflow.team_id),
            extra: workflow.extra.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch::NextAction;

    #[test]
    fn draft_connects_trigger_to_exit() {
        let workflow = Workflow::new_draft();
        assert!(workflow.id.is_unsaved());
        assert_eq!(workflow.actions.len(), 2);

        let trigger = workflow
            .action(&ActionId::from(DRAFT_TRIGGER_ID))
            .expect("trigger");
        assert_eq!(
            trigger.next_actions.continue_action().map(|n| n.action_id.as_str()),
            Some(DRAFT_EXIT_ID)
        );
        assert!(workflow.validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_exit() {
        let mut workflow = Workflow::new_draft();
        workflow.actions.retain(|a| a.action_type != ActionType::Exit);
        assert_eq!(workflow.validate(), Err(ValidationError::MissingExit));
    }

    #[test]
    fn validate_rejects_second_trigger() {
        let mut workflow = Workflow::new_draft();
        workflow
            .actions
            .push(Action::new("t2", ActionType::Trigger, "Another"));
        assert_eq!(
            workflow.validate(),
            Err(ValidationError::MultipleTriggers { count: 2 })
        );
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let mut workflow = Workflow::new_draft();
        workflow
            .actions
            .insert(1, Action::new(DRAFT_TRIGGER_ID, ActionType::Delay, "Dup"));
        assert_eq!(
            workflow.validate(),
            Err(ValidationError::DuplicateActionId {
                action_id: ActionId::from(DRAFT_TRIGGER_ID)
            })
        );
    }

    #[test]
    fn validate_rejects_dangling_reference() {
        let mut workflow = Workflow::new_draft();
        workflow.actions[0]
            .next_actions
            .insert("continue", NextAction::new("missing", None));
        assert!(matches!(
            workflow.validate(),
            Err(ValidationError::DanglingReference { .. })
        ));
    }

    #[test]
    fn lookups_do_not_depend_on_position() {
        let mut workflow = Workflow::new_draft();
        workflow.actions.reverse();
        assert!(workflow.validate().is_ok());
        assert_eq!(
            workflow
                .first_of_type(&ActionType::Exit)
                .map(|a| a.id.as_str()),
            Some(DRAFT_EXIT_ID)
        );
    }

    #[test]
    fn reachable_from_trigger_covers_chain() {
        let workflow = Workflow::new_draft();
        let reachable = workflow.reachable_from_trigger().expect("reachable");
        assert!(reachable.contains(&ActionId::from(DRAFT_TRIGGER_ID)));
        assert!(reachable.contains(&ActionId::from(DRAFT_EXIT_ID)));
    }

    #[test]
    fn update_applies_only_set_fields() {
        let mut workflow = Workflow::new_draft();
        WorkflowUpdate {
            name: Some("Onboarding".to_string()),
            status: Some(WorkflowStatus::Active),
            ..Default::default()
        }
        .apply_to(&mut workflow);

        assert_eq!(workflow.name, "Onboarding");
        assert_eq!(workflow.status, WorkflowStatus::Active);
        assert_eq!(workflow.actions.len(), 2);
    }

    #[test]
    fn workflow_description_keeps_null_and_absence_apart() {
        let mut raw = serde_json::to_value(Workflow::new_draft()).expect("serialize");
        assert!(raw.get("description").is_none());
        let missing: Workflow = serde_json::from_value(raw.clone()).expect("deserialize");
        assert_eq!(missing.description, None);
        assert_eq!(serde_json::to_value(&missing).expect("serialize"), raw);

        raw["description"] = JsonValue::Null;
        let null: Workflow = serde_json::from_value(raw.clone()).expect("deserialize");
        assert_eq!(null.description, Some(None));
        assert_eq!(serde_json::to_value(&null).expect("serialize"), raw);
    }

    #[test]
    fn update_from_workflow_carries_team_and_extra() {
        let mut workflow = Workflow::new_draft();
        workflow.team_id = 3;
        workflow.extra.insert("stop_type".to_string(), json!("trigger"));

        let mut target = Workflow::new_draft();
        WorkflowUpdate::from(&workflow).apply_to(&mut target);
        assert_eq!(target, workflow);
    }

    #[test]
    fn workflow_json_roundtrip_keeps_unknown_fields() {
        let raw = serde_json::json!({
            "id": "wf_1",
            "name": "Welcome",
            "actions": [
                {
                    "id": "trigger_node",
                    "type": "trigger",
                    "name": "Trigger",
                    "description": "",
                    "created_at": 0,
                    "updated_at": 0,
                    "next_actions": { "continue": { "action_id": "exit_node" } }
                },
                {
                    "id": "exit_node",
                    "type": "exit",
                    "name": "Exit",
                    "description": "",
                    "config": { "reason": "Default exit" },
                    "created_at": 0,
                    "updated_at": 0,
                    "next_actions": {}
                }
            ],
            "trigger": { "type": "event", "filters": [] },
            "trigger_masking": { "ttl": 0, "hash": "", "threshold": 0 },
            "conversion": { "window_minutes": 0, "filters": [] },
            "exit_condition": "exit_on_conversion",
            "version": 4,
            "status": "active",
            "team_id": 7,
            "stop_type": "trigger"
        });

        let workflow: Workflow = serde_json::from_value(raw.clone()).expect("deserialize");
        assert_eq!(workflow.exit_condition, ExitCondition::ExitOnConversion);
        assert_eq!(workflow.extra.get("stop_type"), Some(&serde_json::json!("trigger")));
        assert_eq!(serde_json::to_value(&workflow).expect("serialize"), raw);
    }
}
