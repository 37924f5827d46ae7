//! Removing steps while keeping the graph connected.

use crate::error::EditError;
use crate::projection::edge_id;
use flowcanvas_core::ActionId;
use flowcanvas_workflow::{Action, CONTINUE_BRANCH, NextAction, NextActions};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Removes `deleted` from `actions` and reconnects what is left.
///
/// A retained branch that led into a deleted step is rewired to that step's
/// `continue` successor. Runs of deleted steps are skipped until a retained
/// successor is found. If the chain ends at a deleted step without a
/// `continue` branch, or loops back on itself, the branch is dropped.
///
/// The rewired branch keeps the label of the last skipped step's `continue`
/// branch only when the retained step has the same type as that skipped step.
///
/// Callers must not pass the trigger or exit step.
///
/// # Errors
///
/// - `ActionNotFound` if an id in `deleted` is not a step of `actions`
/// - `DanglingEdgeTarget` if a skipped step's `continue` branch leads to a
///   step that does not exist
pub fn delete_actions(actions: &[Action], deleted: &[ActionId]) -> Result<Vec<Action>, EditError> {
    let by_id: HashMap<&ActionId, &Action> = actions.iter().map(|a| (&a.id, a)).collect();
    for action_id in deleted {
        if !by_id.contains_key(action_id) {
            return Err(EditError::ActionNotFound {
                action_id: action_id.clone(),
            });
        }
    }
    let deleted: HashSet<&ActionId> = deleted.iter().collect();

    let mut rewired = 0usize;
    let mut dropped = 0usize;
    let mut retained = Vec::with_capacity(actions.len().saturating_sub(deleted.len()));
    for action in actions.iter().filter(|a| !deleted.contains(&a.id)) {
        let mut next_actions = NextActions::new();
        for (branch, next) in action.next_actions.iter() {
            if !deleted.contains(&next.action_id) {
                next_actions.insert(branch, next.clone());
                continue;
            }
            match resolve_successor(action, &next.action_id, &by_id, &deleted)? {
                Some(successor) => {
                    next_actions.insert(branch, successor);
                    rewired += 1;
                }
                None => dropped += 1,
            }
        }
        retained.push(Action {
            next_actions,
            ..action.clone()
        });
    }

    debug!(
        deleted = deleted.len(),
        rewired, dropped, "deleted steps and reconnected graph"
    );
    Ok(retained)
}

/// Follows `continue` branches from the deleted step `start` to the first
/// retained step.
fn resolve_successor(
    upstream: &Action,
    start: &ActionId,
    by_id: &HashMap<&ActionId, &Action>,
    deleted: &HashSet<&ActionId>,
) -> Result<Option<NextAction>, EditError> {
    let mut visited: HashSet<&ActionId> = HashSet::from([start]);
    let mut current = start;

    loop {
        let Some(skipped) = by_id.get(current) else {
            return Ok(None);
        };
        let Some(next) = skipped.next_actions.continue_action() else {
            return Ok(None);
        };

        if !by_id.contains_key(&next.action_id) {
            return Err(EditError::DanglingEdgeTarget {
                edge_id: edge_id(CONTINUE_BRANCH, &skipped.id, &next.action_id),
                target: next.action_id.clone(),
            });
        }

        if !deleted.contains(&next.action_id) {
            let label = if upstream.action_type == skipped.action_type {
                next.label.clone()
            } else {
                None
            };
            return Ok(Some(NextAction {
                action_id: next.action_id.clone(),
                label,
            }));
        }

        if !visited.insert(&next.action_id) {
            return Ok(None);
        }
        current = &next.action_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcanvas_workflow::{ActionType, Workflow};

    fn ids(list: &[&str]) -> Vec<ActionId> {
        list.iter().map(|id| ActionId::from(*id)).collect()
    }

    fn step<'a>(actions: &'a [Action], id: &str) -> &'a Action {
        actions
            .iter()
            .find(|a| a.id.as_str() == id)
            .expect("step present")
    }

    fn linear(middle: &[(&str, ActionType)]) -> Vec<Action> {
        let mut actions = Vec::new();
        let first = middle.first().map_or("exit_node", |(id, _)| *id);
        actions.push(Action::new("trigger_node", ActionType::Trigger, "").with_next(
            "continue",
            first,
            None,
        ));
        for (index, (id, action_type)) in middle.iter().enumerate() {
            let next = middle.get(index + 1).map_or("exit_node", |(id, _)| *id);
            actions.push(
                Action::new(*id, action_type.clone(), "").with_next(
                    "continue",
                    next,
                    Some(&format!("from {id}")),
                ),
            );
        }
        actions.push(Action::new("exit_node", ActionType::Exit, ""));
        actions
    }

    #[test]
    fn delete_reconnects_around_step() {
        let actions = linear(&[
            ("a", ActionType::Delay),
            ("b", ActionType::Delay),
            ("c", ActionType::Delay),
        ]);
        let updated = delete_actions(&actions, &ids(&["b"])).expect("delete");

        assert_eq!(updated.len(), 4);
        assert!(updated.iter().all(|a| a.id.as_str() != "b"));
        assert!(!updated.iter().any(|a| a.points_to(&ActionId::from("b"))));
        assert_eq!(
            step(&updated, "a")
                .next_actions
                .continue_action()
                .map(|n| n.action_id.as_str()),
            Some("c")
        );
        assert_eq!(actions.len(), 5);
    }

    #[test]
    fn label_kept_for_same_type_only() {
        let same = linear(&[("a", ActionType::Message), ("b", ActionType::Message)]);
        let updated = delete_actions(&same, &ids(&["b"])).expect("delete");
        assert_eq!(
            step(&updated, "a").next_actions.continue_action(),
            Some(&NextAction::new("exit_node", Some("from b")))
        );

        let mixed = linear(&[("a", ActionType::Delay), ("b", ActionType::Message)]);
        let updated = delete_actions(&mixed, &ids(&["b"])).expect("delete");
        assert_eq!(
            step(&updated, "a").next_actions.continue_action(),
            Some(&NextAction::new("exit_node", None))
        );
    }

    #[test]
    fn branch_dropped_when_deleted_step_has_no_continue() {
        let actions = vec![
            Action::new("trigger_node", ActionType::Trigger, "").with_next("continue", "w", None),
            Action::new("w", ActionType::WaitUntilCondition, "")
                .with_next("continue", "exit_node", None)
                .with_next("abort", "dead_end", None),
            Action::new("dead_end", ActionType::Delay, ""),
            Action::new("exit_node", ActionType::Exit, ""),
        ];
        let updated = delete_actions(&actions, &ids(&["dead_end"])).expect("delete");
        let wait = step(&updated, "w");
        assert_eq!(wait.next_actions.len(), 1);
        assert!(wait.next_actions.get("abort").is_none());
    }

    #[test]
    fn chain_of_deleted_steps_is_skipped() {
        let actions = linear(&[
            ("a", ActionType::Delay),
            ("b", ActionType::Delay),
            ("c", ActionType::Delay),
            ("d", ActionType::Delay),
        ]);
        let updated = delete_actions(&actions, &ids(&["b", "c"])).expect("delete");

        assert_eq!(
            step(&updated, "a").next_actions.continue_action(),
            Some(&NextAction::new("d", Some("from c")))
        );
        let workflow = Workflow::new_draft().with_actions(updated);
        assert!(workflow.validate().is_ok());
    }

    #[test]
    fn deleted_cycle_drops_branch() {
        let actions = vec![
            Action::new("trigger_node", ActionType::Trigger, "").with_next("continue", "a", None),
            Action::new("a", ActionType::Delay, "").with_next("continue", "b", None),
            Action::new("b", ActionType::Delay, "").with_next("continue", "a", None),
            Action::new("exit_node", ActionType::Exit, ""),
        ];
        let updated = delete_actions(&actions, &ids(&["a", "b"])).expect("delete");
        assert!(step(&updated, "trigger_node").next_actions.is_empty());
    }

    #[test]
    fn delete_rejects_unknown_ids() {
        let actions = Workflow::new_draft().actions;
        assert_eq!(
            delete_actions(&actions, &ids(&["ghost"])),
            Err(EditError::ActionNotFound {
                action_id: ActionId::from("ghost")
            })
        );
    }

    #[test]
    fn delete_rejects_dangling_successor() {
        let actions = vec![
            Action::new("trigger_node", ActionType::Trigger, "").with_next("continue", "a", None),
            Action::new("a", ActionType::Delay, "").with_next("continue", "ghost", None),
            Action::new("exit_node", ActionType::Exit, ""),
        ];
        assert!(matches!(
            delete_actions(&actions, &ids(&["a"])),
            Err(EditError::DanglingEdgeTarget { .. })
        ));
    }
}
