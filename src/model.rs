//! Engagement and task data model types.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Generate a new ULID string.
pub fn new_id() -> String {
    ulid::Ulid::new().to_string()
}

// ─── Engagement ───────────────────────────────────────────────────────────────

/// The kind of professional-services engagement. Exactly one applies at a
/// time and determines which operational tasks count toward progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementNature {
    Audit,
    Review,
    Compilation,
}

impl std::fmt::Display for EngagementNature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EngagementNature::Audit => "audit",
            EngagementNature::Review => "review",
            EngagementNature::Compilation => "compilation",
        };
        write!(f, "{}", s)
    }
}

/// Final-outcome status of an engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementStatus {
    Unset,
    Pending,
    Approved,
    Rejected,
}

impl EngagementStatus {
    /// True once a decision has been recorded (approved or rejected).
    pub fn is_decided(&self) -> bool {
        matches!(self, EngagementStatus::Approved | EngagementStatus::Rejected)
    }
}

/// The parent business record that tasks belong to.
///
/// Role-holder fields and `team` are set by the engagement CRUD flow and are
/// read-only to the workflow engine. They are independent sources of truth
/// from task assignment maps and are only reconciled at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    pub id: String,
    /// Client-facing engagement name.
    pub name: String,
    pub nature: EngagementNature,
    pub status: EngagementStatus,
    pub decision_comment: Option<String>,
    pub associate_in_charge: Option<String>,
    pub manager_in_charge: Option<String>,
    pub co_manager_in_charge: Option<String>,
    pub senior_manager_in_charge: Option<String>,
    pub team: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

impl Engagement {
    /// Role label for a member id, matched against the in-charge fields.
    /// Members outside every in-charge field get no label here.
    pub fn role_label(&self, member_id: &str) -> Option<&'static str> {
        if self.associate_in_charge.as_deref() == Some(member_id) {
            Some("associate in charge")
        } else if self.manager_in_charge.as_deref() == Some(member_id) {
            Some("manager in charge")
        } else if self.co_manager_in_charge.as_deref() == Some(member_id) {
            Some("co-manager in charge")
        } else if self.senior_manager_in_charge.as_deref() == Some(member_id) {
            Some("senior manager in charge")
        } else {
            None
        }
    }
}

// ─── Task naming ──────────────────────────────────────────────────────────────

/// Predefined engagement work items. Instantiated from the catalog when an
/// engagement is created; catalog tasks cannot be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogTask {
    ClientAcceptance,
    EngagementLetter,
    IndependenceCheck,
    PlanningMemo,
    RiskAssessment,
    Fieldwork,
    AnalyticalReview,
    ManagementRepLetter,
    ReportDraft,
    FileArchival,
}

impl CatalogTask {
    pub fn label(&self) -> &'static str {
        match self {
            CatalogTask::ClientAcceptance => "Client acceptance",
            CatalogTask::EngagementLetter => "Engagement letter",
            CatalogTask::IndependenceCheck => "Independence check",
            CatalogTask::PlanningMemo => "Planning memo",
            CatalogTask::RiskAssessment => "Risk assessment",
            CatalogTask::Fieldwork => "Fieldwork",
            CatalogTask::AnalyticalReview => "Analytical review",
            CatalogTask::ManagementRepLetter => "Management representation letter",
            CatalogTask::ReportDraft => "Report draft",
            CatalogTask::FileArchival => "File archival",
        }
    }

    /// Weight contributed toward 100%-normalized engagement progress.
    pub fn default_weight(&self) -> u32 {
        match self {
            CatalogTask::ClientAcceptance => 5,
            CatalogTask::EngagementLetter => 5,
            CatalogTask::IndependenceCheck => 5,
            CatalogTask::PlanningMemo => 10,
            CatalogTask::RiskAssessment => 15,
            CatalogTask::Fieldwork => 30,
            CatalogTask::AnalyticalReview => 10,
            CatalogTask::ManagementRepLetter => 5,
            CatalogTask::ReportDraft => 10,
            CatalogTask::FileArchival => 5,
        }
    }

    /// The standard task set seeded for a new engagement of the given nature.
    ///
    /// Administrative entries apply to every nature; operational entries are
    /// scoped to the nature they are seeded with.
    pub fn defaults_for(nature: EngagementNature) -> Vec<TaskSeed> {
        let mut seeds = vec![
            TaskSeed::administrative(CatalogTask::ClientAcceptance),
            TaskSeed::administrative(CatalogTask::EngagementLetter),
            TaskSeed::administrative(CatalogTask::IndependenceCheck),
            TaskSeed::administrative(CatalogTask::FileArchival),
        ];
        let operational: &[CatalogTask] = match nature {
            EngagementNature::Audit => &[
                CatalogTask::PlanningMemo,
                CatalogTask::RiskAssessment,
                CatalogTask::Fieldwork,
                CatalogTask::ManagementRepLetter,
                CatalogTask::ReportDraft,
            ],
            EngagementNature::Review => &[
                CatalogTask::PlanningMemo,
                CatalogTask::AnalyticalReview,
                CatalogTask::ManagementRepLetter,
                CatalogTask::ReportDraft,
            ],
            EngagementNature::Compilation => {
                &[CatalogTask::PlanningMemo, CatalogTask::ReportDraft]
            }
        };
        seeds.extend(operational.iter().map(|c| TaskSeed::operational(*c, nature)));
        seeds
    }
}

/// A catalog entry ready to be materialized into a `TaskRecord`.
#[derive(Debug, Clone)]
pub struct TaskSeed {
    pub catalog: CatalogTask,
    pub nature: Option<EngagementNature>,
}

impl TaskSeed {
    fn administrative(catalog: CatalogTask) -> Self {
        Self { catalog, nature: None }
    }

    fn operational(catalog: CatalogTask, nature: EngagementNature) -> Self {
        Self { catalog, nature: Some(nature) }
    }
}

/// Task display name: a reference into the predefined catalog, or free text
/// for a manually created task. The two are mutually exclusive; only custom
/// tasks may be deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskName {
    Catalog(CatalogTask),
    Custom(String),
}

impl TaskName {
    pub fn display(&self) -> &str {
        match self {
            TaskName::Catalog(c) => c.label(),
            TaskName::Custom(text) => text,
        }
    }

    /// Manually created tasks carry free text and are the only deletable kind.
    pub fn is_custom(&self) -> bool {
        matches!(self, TaskName::Custom(_))
    }
}

// ─── Task detail ──────────────────────────────────────────────────────────────

/// Tri-state progress of an administrative task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminPhase {
    NotStarted,
    InProgress,
    Done,
}

impl AdminPhase {
    /// Fixed cycle: NotStarted → InProgress → Done → NotStarted.
    pub fn advance(&self) -> AdminPhase {
        match self {
            AdminPhase::NotStarted => AdminPhase::InProgress,
            AdminPhase::InProgress => AdminPhase::Done,
            AdminPhase::Done => AdminPhase::NotStarted,
        }
    }
}

/// Task category, derived from the detail variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Operational,
    Administrative,
}

/// Category-specific task state. A task is either operational (per-member
/// completion map, scoped to one nature) or administrative (single tri-state
/// phase) — the variant makes a hybrid unrepresentable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum TaskDetail {
    Operational {
        nature: EngagementNature,
        /// member id → "this member is done".
        assignment: BTreeMap<String, bool>,
    },
    Administrative {
        phase: AdminPhase,
    },
}

// ─── TaskRecord ───────────────────────────────────────────────────────────────

/// A single work item attached to an engagement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub engagement_id: String,
    pub name: TaskName,
    pub weight: u32,
    pub deadline: Option<NaiveDate>,
    /// Stable tie-break for display order.
    pub order_key: i32,
    #[serde(flatten)]
    pub detail: TaskDetail,
    /// Denormalized completion flag for readers that only understand a
    /// boolean. Always recomputed from `detail`; never trusted on load.
    pub done: bool,
}

impl TaskRecord {
    pub fn category(&self) -> TaskCategory {
        match self.detail {
            TaskDetail::Operational { .. } => TaskCategory::Operational,
            TaskDetail::Administrative { .. } => TaskCategory::Administrative,
        }
    }

    /// Completion state derived from the detail variant.
    ///
    /// Operational: the assignment map is non-empty and every member is done.
    /// An empty map is never done — a task with nobody assigned cannot be
    /// complete. Administrative: the phase is `Done`.
    pub fn computed_done(&self) -> bool {
        match &self.detail {
            TaskDetail::Operational { assignment, .. } => {
                !assignment.is_empty() && assignment.values().all(|done| *done)
            }
            TaskDetail::Administrative { phase } => *phase == AdminPhase::Done,
        }
    }

    /// Re-sync the denormalized `done` flag with the detail state.
    pub fn sync_done(&mut self) {
        self.done = self.computed_done();
    }

    /// Nature the task belongs to; administrative tasks have none.
    pub fn nature(&self) -> Option<EngagementNature> {
        match &self.detail {
            TaskDetail::Operational { nature, .. } => Some(*nature),
            TaskDetail::Administrative { .. } => None,
        }
    }

    pub fn assignment(&self) -> Option<&BTreeMap<String, bool>> {
        match &self.detail {
            TaskDetail::Operational { assignment, .. } => Some(assignment),
            TaskDetail::Administrative { .. } => None,
        }
    }

    pub fn phase(&self) -> Option<AdminPhase> {
        match &self.detail {
            TaskDetail::Operational { .. } => None,
            TaskDetail::Administrative { phase } => Some(*phase),
        }
    }

    /// Materialize a catalog seed into a task record.
    pub fn from_seed(engagement_id: &str, seed: &TaskSeed, order_key: i32) -> Self {
        let detail = match seed.nature {
            Some(nature) => TaskDetail::Operational {
                nature,
                assignment: BTreeMap::new(),
            },
            None => TaskDetail::Administrative {
                phase: AdminPhase::NotStarted,
            },
        };
        Self {
            id: new_id(),
            engagement_id: engagement_id.to_string(),
            name: TaskName::Catalog(seed.catalog),
            weight: seed.catalog.default_weight(),
            deadline: None,
            order_key,
            detail,
            done: false,
        }
    }
}
