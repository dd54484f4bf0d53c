//! Approve/reject decision rules for the engagement outcome.
//!
//! `Unset → {Approved, Rejected}`, and the approver may reverse a recorded
//! decision (`Approved ⇄ Rejected`) at any time. There is no terminal lock
//! in the data model; reversal is expected to be rare.

use serde::{Deserialize, Serialize};

use crate::model::{Engagement, EngagementStatus};
use crate::policy;

/// Terminal outcome submitted by the approver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    Approved,
    Rejected,
}

impl From<DecisionOutcome> for EngagementStatus {
    fn from(outcome: DecisionOutcome) -> Self {
        match outcome {
            DecisionOutcome::Approved => EngagementStatus::Approved,
            DecisionOutcome::Rejected => EngagementStatus::Rejected,
        }
    }
}

/// Whether `user_id` may submit a decision right now.
///
/// A first decision is open while the status is Unset/Pending and a
/// re-decision is always open — so the approver can always submit, and
/// nobody else ever can.
pub fn can_edit(engagement: &Engagement, user_id: &str) -> bool {
    policy::is_approver(engagement, user_id)
}

/// Whether `user_id` may see the recorded decision.
///
/// Nothing is visible until an outcome exists. Once decided, visibility is
/// limited to the approver, the manager-in-charge, the senior-manager-in-
/// charge, and listed team members.
pub fn can_view(engagement: &Engagement, user_id: &str) -> bool {
    if !engagement.status.is_decided() {
        return false;
    }
    policy::is_approver(engagement, user_id)
        || engagement.manager_in_charge.as_deref() == Some(user_id)
        || engagement.senior_manager_in_charge.as_deref() == Some(user_id)
        || engagement.team.contains(user_id)
}

/// Build the post-decision engagement record.
///
/// An empty or absent comment keeps the prior comment; a decision never
/// silently erases earlier rationale.
pub fn apply(
    engagement: &Engagement,
    outcome: DecisionOutcome,
    comment: Option<&str>,
) -> Engagement {
    let mut updated = engagement.clone();
    updated.status = outcome.into();
    let comment = comment.map(str::trim).filter(|c| !c.is_empty());
    if let Some(comment) = comment {
        updated.decision_comment = Some(comment.to_string());
    }
    updated
}
