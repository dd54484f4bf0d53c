//! Role resolution and mutation authorization.
//!
//! Task-state mutation rights belong to the manager-in-charge and
//! co-manager-in-charge only. The associate-in-charge and senior-manager-in-
//! charge are view-only for task state even though they outrank the managers
//! on the engagement — the associate's sole authority is the final decision.
//! This asymmetry is intentional; do not widen it without product sign-off.

use crate::model::{Engagement, TaskRecord};

/// True iff `user_id` is the manager-in-charge or co-manager-in-charge.
pub fn is_manager_of(engagement: &Engagement, user_id: &str) -> bool {
    engagement.manager_in_charge.as_deref() == Some(user_id)
        || engagement.co_manager_in_charge.as_deref() == Some(user_id)
}

/// Whether `user_id` may mutate task state on this engagement: assigning
/// members, changing an administrative phase, toggling a whole task, or
/// deleting a manually created task.
pub fn can_mutate_task_state(engagement: &Engagement, user_id: &str) -> bool {
    is_manager_of(engagement, user_id)
}

/// A team member may flip their own entry in a task's assignment map and
/// nothing else, regardless of manager status on other engagements.
pub fn can_toggle_own_completion(task: &TaskRecord, user_id: &str) -> bool {
    task.assignment()
        .map(|a| a.contains_key(user_id))
        .unwrap_or(false)
}

/// Sole authority for the final approve/reject decision.
pub fn is_approver(engagement: &Engagement, user_id: &str) -> bool {
    engagement.associate_in_charge.as_deref() == Some(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        EngagementNature, EngagementStatus, TaskDetail, TaskName,
    };
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn engagement() -> Engagement {
        Engagement {
            id: "e1".to_string(),
            name: "Acme Corp FY25".to_string(),
            nature: EngagementNature::Audit,
            status: EngagementStatus::Unset,
            decision_comment: None,
            associate_in_charge: Some("alice".to_string()),
            manager_in_charge: Some("mark".to_string()),
            co_manager_in_charge: Some("carol".to_string()),
            senior_manager_in_charge: Some("sam".to_string()),
            team: ["tina".to_string()].into(),
            created_at: Utc::now(),
        }
    }

    fn task_assigned_to(members: &[&str]) -> TaskRecord {
        TaskRecord {
            id: "t1".to_string(),
            engagement_id: "e1".to_string(),
            name: TaskName::Custom("test".to_string()),
            weight: 10,
            deadline: None,
            order_key: 0,
            detail: TaskDetail::Operational {
                nature: EngagementNature::Audit,
                assignment: members
                    .iter()
                    .map(|m| (m.to_string(), false))
                    .collect::<BTreeMap<_, _>>(),
            },
            done: false,
        }
    }

    #[test]
    fn managers_can_mutate() {
        let e = engagement();
        assert!(can_mutate_task_state(&e, "mark"));
        assert!(can_mutate_task_state(&e, "carol"));
    }

    #[test]
    fn senior_roles_are_view_only_for_task_state() {
        let e = engagement();
        assert!(!can_mutate_task_state(&e, "alice"));
        assert!(!can_mutate_task_state(&e, "sam"));
        assert!(!can_mutate_task_state(&e, "tina"));
    }

    #[test]
    fn own_completion_requires_assignment_entry() {
        let task = task_assigned_to(&["tina"]);
        assert!(can_toggle_own_completion(&task, "tina"));
        // Even the manager cannot flip an entry that is not theirs.
        assert!(!can_toggle_own_completion(&task, "mark"));
    }

    #[test]
    fn only_the_associate_approves() {
        let e = engagement();
        assert!(is_approver(&e, "alice"));
        assert!(!is_approver(&e, "mark"));
        assert!(!is_approver(&e, "sam"));
    }

    #[test]
    fn unset_role_holders_match_nobody() {
        let mut e = engagement();
        e.manager_in_charge = None;
        e.co_manager_in_charge = None;
        assert!(!can_mutate_task_state(&e, "mark"));
    }
}
