//! Engagement progress aggregation.
//!
//! Everything here is a pure, synchronous read over whatever task snapshot
//! the caller holds — no hidden state, no I/O. The one exception is member
//! ticket resolution, which consults the member directory best-effort and
//! degrades to placeholder labels when a reference cannot be resolved.

use serde::{Deserialize, Serialize};

use crate::model::{Engagement, TaskCategory, TaskDetail, TaskRecord};
use crate::store::MemberDirectory;

/// Label shown for an assignment entry whose member id no longer resolves.
pub const UNKNOWN_MEMBER_LABEL: &str = "unknown member";

/// Role label for team members outside every in-charge field.
pub const TEAM_MEMBER_LABEL: &str = "team member";

// ─── Derived views ────────────────────────────────────────────────────────────

/// One member's completion line for a single operational task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberTicket {
    pub member_id: String,
    pub display_name: String,
    pub role_label: String,
    pub done: bool,
}

/// Weighted completion summary for an engagement's in-scope tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateProgress {
    pub completed_weight: u32,
    pub total_weight: u32,
    /// Rounded half-up; always within 0..=100.
    pub percent: u8,
}

impl AggregateProgress {
    pub fn label(&self) -> String {
        format!(
            "{} / {} pts · {}%",
            self.completed_weight, self.total_weight, self.percent
        )
    }
}

// ─── Scope & aggregation ──────────────────────────────────────────────────────

/// Whether a task counts toward the given engagement's progress.
///
/// Administrative tasks always count. Operational tasks count only when
/// their nature matches the engagement's current nature.
pub fn in_scope(task: &TaskRecord, engagement: &Engagement) -> bool {
    match task.nature() {
        None => true,
        Some(nature) => nature == engagement.nature,
    }
}

/// Weighted progress over the in-scope subset of `tasks`.
///
/// An engagement with no in-scope weight reports 0% rather than dividing
/// by zero.
pub fn progress(tasks: &[TaskRecord], engagement: &Engagement) -> AggregateProgress {
    let mut total: u32 = 0;
    let mut completed: u32 = 0;
    for task in tasks.iter().filter(|t| in_scope(t, engagement)) {
        total += task.weight;
        if task.computed_done() {
            completed += task.weight;
        }
    }
    AggregateProgress {
        completed_weight: completed,
        total_weight: total,
        percent: percent_of(completed, total),
    }
}

/// Integer percentage, rounded half-up.
fn percent_of(completed: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let scaled = u64::from(completed) * 100;
    let quotient = scaled / u64::from(total);
    let remainder = scaled % u64::from(total);
    let rounded = if remainder * 2 >= u64::from(total) {
        quotient + 1
    } else {
        quotient
    };
    rounded as u8
}

// ─── Per-task member view ─────────────────────────────────────────────────────

/// Resolve each assignment entry of an operational task into a display
/// ticket. Administrative tasks have no member breakdown and yield an
/// empty list.
///
/// Role labels come from the engagement's in-charge fields, falling back to
/// "team member". Directory lookups are best-effort: a failed resolution
/// yields the placeholder display name instead of aborting the render.
pub async fn member_tickets(
    task: &TaskRecord,
    engagement: &Engagement,
    directory: &dyn MemberDirectory,
) -> Vec<MemberTicket> {
    let assignment = match &task.detail {
        TaskDetail::Operational { assignment, .. } => assignment,
        TaskDetail::Administrative { .. } => return Vec::new(),
    };

    let mut tickets = Vec::with_capacity(assignment.len());
    for (member_id, done) in assignment {
        let display_name = match directory.resolve_member(member_id).await {
            Ok(profile) => profile.display_name,
            Err(err) => {
                tracing::debug!(member_id = %member_id, %err, "member lookup failed, using placeholder");
                UNKNOWN_MEMBER_LABEL.to_string()
            }
        };
        let role_label = engagement
            .role_label(member_id)
            .unwrap_or(TEAM_MEMBER_LABEL)
            .to_string();
        tickets.push(MemberTicket {
            member_id: member_id.clone(),
            display_name,
            role_label,
            done: *done,
        });
    }
    tickets
}

/// The personal task list: operational, in scope, and assigned to `member_id`.
/// Administrative tasks never appear here.
pub fn my_tasks<'a>(
    tasks: &'a [TaskRecord],
    engagement: &Engagement,
    member_id: &str,
) -> Vec<&'a TaskRecord> {
    tasks
        .iter()
        .filter(|t| t.category() == TaskCategory::Operational)
        .filter(|t| in_scope(t, engagement))
        .filter(|t| {
            t.assignment()
                .map(|a| a.contains_key(member_id))
                .unwrap_or(false)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AdminPhase, EngagementNature, EngagementStatus, TaskDetail, TaskName,
    };
    use crate::store::memory::MemoryStore;
    use chrono::Utc;

    fn engagement(nature: EngagementNature) -> Engagement {
        Engagement {
            id: "e1".to_string(),
            name: "Acme Corp FY25".to_string(),
            nature,
            status: EngagementStatus::Unset,
            decision_comment: None,
            associate_in_charge: Some("alice".to_string()),
            manager_in_charge: Some("mark".to_string()),
            co_manager_in_charge: None,
            senior_manager_in_charge: None,
            team: ["tina".to_string()].into(),
            created_at: Utc::now(),
        }
    }

    fn operational(
        id: &str,
        nature: EngagementNature,
        weight: u32,
        assignment: &[(&str, bool)],
    ) -> TaskRecord {
        TaskRecord {
            id: id.to_string(),
            engagement_id: "e1".to_string(),
            name: TaskName::Custom(format!("task {}", id)),
            weight,
            deadline: None,
            order_key: 0,
            detail: TaskDetail::Operational {
                nature,
                assignment: assignment
                    .iter()
                    .map(|(m, d)| (m.to_string(), *d))
                    .collect(),
            },
            done: false,
        }
    }

    fn administrative(id: &str, weight: u32, phase: AdminPhase) -> TaskRecord {
        TaskRecord {
            id: id.to_string(),
            engagement_id: "e1".to_string(),
            name: TaskName::Custom(format!("task {}", id)),
            weight,
            deadline: None,
            order_key: 0,
            detail: TaskDetail::Administrative { phase },
            done: false,
        }
    }

    #[test]
    fn empty_task_set_reports_zero() {
        let e = engagement(EngagementNature::Audit);
        let p = progress(&[], &e);
        assert_eq!(p.percent, 0);
        assert_eq!(p.total_weight, 0);
    }

    #[test]
    fn out_of_scope_operational_tasks_are_ignored() {
        let e = engagement(EngagementNature::Audit);
        let tasks = vec![
            operational("t1", EngagementNature::Audit, 10, &[("tina", true)]),
            operational("t2", EngagementNature::Review, 90, &[("tina", true)]),
        ];
        let p = progress(&tasks, &e);
        assert_eq!(p.total_weight, 10);
        assert_eq!(p.percent, 100);
    }

    #[test]
    fn administrative_tasks_always_count() {
        let e = engagement(EngagementNature::Compilation);
        let tasks = vec![administrative("t1", 20, AdminPhase::Done)];
        let p = progress(&tasks, &e);
        assert_eq!(p.percent, 100);
        assert_eq!(p.label(), "20 / 20 pts · 100%");
    }

    #[test]
    fn percent_rounds_half_up() {
        let e = engagement(EngagementNature::Audit);
        // 1 of 3 → 33.33 → 33; 1 of 8 → 12.5 → 13.
        let tasks = vec![
            operational("t1", EngagementNature::Audit, 1, &[("tina", true)]),
            operational("t2", EngagementNature::Audit, 2, &[("tina", false)]),
        ];
        assert_eq!(progress(&tasks, &e).percent, 33);
        let tasks = vec![
            operational("t1", EngagementNature::Audit, 1, &[("tina", true)]),
            operational("t2", EngagementNature::Audit, 7, &[("tina", false)]),
        ];
        assert_eq!(progress(&tasks, &e).percent, 13);
    }

    #[test]
    fn unassigned_task_weight_counts_as_not_done() {
        let e = engagement(EngagementNature::Audit);
        let tasks = vec![
            operational("t1", EngagementNature::Audit, 50, &[("tina", true)]),
            operational("t2", EngagementNature::Audit, 50, &[]),
        ];
        assert_eq!(progress(&tasks, &e).percent, 50);
    }

    #[test]
    fn my_tasks_filters_scope_and_assignment() {
        let e = engagement(EngagementNature::Audit);
        let tasks = vec![
            operational("t1", EngagementNature::Audit, 10, &[("tina", false)]),
            operational("t2", EngagementNature::Review, 10, &[("tina", false)]),
            operational("t3", EngagementNature::Audit, 10, &[("mark", false)]),
            administrative("t4", 10, AdminPhase::NotStarted),
        ];
        let mine = my_tasks(&tasks, &e, "tina");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, "t1");
    }

    #[tokio::test]
    async fn member_tickets_resolve_roles_and_placeholders() {
        let e = engagement(EngagementNature::Audit);
        let store = MemoryStore::new();
        store.put_member("mark", "Mark Manning").await;
        let task = operational(
            "t1",
            EngagementNature::Audit,
            10,
            &[("mark", true), ("ghost", false)],
        );

        let tickets = member_tickets(&task, &e, &store).await;
        assert_eq!(tickets.len(), 2);

        let ghost = tickets.iter().find(|t| t.member_id == "ghost").unwrap();
        assert_eq!(ghost.display_name, UNKNOWN_MEMBER_LABEL);
        assert_eq!(ghost.role_label, TEAM_MEMBER_LABEL);

        let mark = tickets.iter().find(|t| t.member_id == "mark").unwrap();
        assert_eq!(mark.display_name, "Mark Manning");
        assert_eq!(mark.role_label, "manager in charge");
        assert!(mark.done);
    }

    proptest::proptest! {
        /// Any mix of weights, completion states, and natures stays within
        /// bounds: completed ≤ total and 0 ≤ percent ≤ 100.
        #[test]
        fn progress_is_always_bounded(
            specs in proptest::collection::vec(
                (1u32..500, proptest::bool::ANY, proptest::bool::ANY, proptest::bool::ANY),
                0..40,
            )
        ) {
            let e = engagement(EngagementNature::Audit);
            let tasks: Vec<TaskRecord> = specs
                .iter()
                .enumerate()
                .map(|(i, (weight, done, admin, matches_nature))| {
                    if *admin {
                        administrative(
                            &format!("t{}", i),
                            *weight,
                            if *done { AdminPhase::Done } else { AdminPhase::InProgress },
                        )
                    } else {
                        let nature = if *matches_nature {
                            EngagementNature::Audit
                        } else {
                            EngagementNature::Review
                        };
                        operational(&format!("t{}", i), nature, *weight, &[("tina", *done)])
                    }
                })
                .collect();
            let p = progress(&tasks, &e);
            proptest::prop_assert!(p.completed_weight <= p.total_weight);
            proptest::prop_assert!(p.percent <= 100);
        }
    }

    #[tokio::test]
    async fn member_tickets_empty_for_administrative() {
        let e = engagement(EngagementNature::Audit);
        let store = MemoryStore::new();
        let task = administrative("t1", 10, AdminPhase::Done);
        assert!(member_tickets(&task, &e, &store).await.is_empty());
    }
}
