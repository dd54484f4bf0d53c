//! External collaborator seams.
//!
//! The engine treats persistence, member lookup, and authentication as
//! request/response collaborators behind traits. The transport behind them
//! (HTTP, database, RPC) is the embedder's business; the engine only relies
//! on the call shapes defined here.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Engagement, TaskDetail, TaskName, TaskRecord};

pub mod memory;

pub use memory::MemoryStore;

// ─── Errors ───────────────────────────────────────────────────────────────────

/// Failures reported by a persistence or directory collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// The backing service rejected or lost the call.
    #[error("store backend failure: {detail}")]
    Backend { detail: String },
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound { kind, id: id.into() }
    }

    pub fn backend(detail: impl Into<String>) -> Self {
        StoreError::Backend { detail: detail.into() }
    }
}

// ─── Persistence ──────────────────────────────────────────────────────────────

/// Fields supplied when creating a task; the store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDraft {
    pub engagement_id: String,
    pub name: TaskName,
    pub weight: u32,
    pub deadline: Option<NaiveDate>,
    /// Display position; `None` lets the store append after existing tasks.
    pub order_key: Option<i32>,
    pub detail: TaskDetail,
}

/// Key-addressed persistence for engagements and their tasks.
///
/// `save_task` and `save_engagement` are full-record upserts. Loaded tasks
/// must pass through [`normalize_loaded_task`] so the denormalized `done`
/// flag is recomputed rather than trusted.
#[async_trait]
pub trait EngagementStore: Send + Sync {
    async fn load_engagement(&self, engagement_id: &str) -> Result<Engagement, StoreError>;

    async fn load_tasks(&self, engagement_id: &str) -> Result<Vec<TaskRecord>, StoreError>;

    async fn save_task(&self, task: &TaskRecord) -> Result<TaskRecord, StoreError>;

    async fn create_task(&self, draft: TaskDraft) -> Result<TaskRecord, StoreError>;

    async fn delete_task(&self, task_id: &str) -> Result<(), StoreError>;

    async fn save_engagement(&self, engagement: &Engagement) -> Result<Engagement, StoreError>;
}

/// Recompute derived state on a record arriving from storage.
pub fn normalize_loaded_task(mut task: TaskRecord) -> TaskRecord {
    task.sync_done();
    task
}

// ─── Member directory ─────────────────────────────────────────────────────────

/// Resolved member identity for display purposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub id: String,
    pub display_name: String,
}

/// Best-effort member resolution. Callers degrade a failed lookup to a
/// placeholder label; implementations should not retry aggressively.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn resolve_member(&self, member_id: &str) -> Result<MemberProfile, StoreError>;
}

// ─── Identity ─────────────────────────────────────────────────────────────────

/// Supplies the acting user's identity from the embedding layer's
/// authentication collaborator.
pub trait IdentityProvider: Send + Sync {
    fn current_user_id(&self) -> String;
}

/// Fixed identity, for embedders with a single signed-in user and for tests.
#[derive(Debug, Clone)]
pub struct StaticIdentity(pub String);

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> String {
        self.0.clone()
    }
}
