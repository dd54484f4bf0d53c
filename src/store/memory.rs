//! In-memory reference store.
//!
//! Backs the integration tests and doubles as a reference implementation of
//! the collaborator traits. Failure injection flips individual operations
//! into backend errors so rollback paths can be exercised deterministically.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::model::{new_id, Engagement, TaskRecord};

use super::{
    normalize_loaded_task, EngagementStore, MemberDirectory, MemberProfile, StoreError,
    TaskDraft,
};

/// Operations that can be made to fail on their next invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    SaveTask,
    CreateTask,
    DeleteTask,
    SaveEngagement,
}

#[derive(Default)]
struct FailFlags {
    save_task: AtomicBool,
    create_task: AtomicBool,
    delete_task: AtomicBool,
    save_engagement: AtomicBool,
}

impl FailFlags {
    fn flag(&self, point: FailPoint) -> &AtomicBool {
        match point {
            FailPoint::SaveTask => &self.save_task,
            FailPoint::CreateTask => &self.create_task,
            FailPoint::DeleteTask => &self.delete_task,
            FailPoint::SaveEngagement => &self.save_engagement,
        }
    }

    /// Consume the flag: returns true at most once per arm.
    fn trip(&self, point: FailPoint) -> bool {
        self.flag(point).swap(false, Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    engagements: RwLock<HashMap<String, Engagement>>,
    tasks: RwLock<HashMap<String, TaskRecord>>,
    members: RwLock<HashMap<String, MemberProfile>>,
    failures: FailFlags,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot failure for the given operation.
    pub fn fail_next(&self, point: FailPoint) {
        self.failures.flag(point).store(true, Ordering::SeqCst);
    }

    pub async fn put_engagement(&self, engagement: Engagement) {
        self.engagements
            .write()
            .await
            .insert(engagement.id.clone(), engagement);
    }

    pub async fn put_task(&self, task: TaskRecord) {
        self.tasks.write().await.insert(task.id.clone(), task);
    }

    pub async fn put_member(&self, id: &str, display_name: &str) {
        self.members.write().await.insert(
            id.to_string(),
            MemberProfile {
                id: id.to_string(),
                display_name: display_name.to_string(),
            },
        );
    }

    /// Direct read of a stored task, for assertions.
    pub async fn task(&self, task_id: &str) -> Option<TaskRecord> {
        self.tasks.read().await.get(task_id).cloned()
    }

    pub async fn engagement(&self, engagement_id: &str) -> Option<Engagement> {
        self.engagements.read().await.get(engagement_id).cloned()
    }
}

#[async_trait]
impl EngagementStore for MemoryStore {
    async fn load_engagement(&self, engagement_id: &str) -> Result<Engagement, StoreError> {
        self.engagements
            .read()
            .await
            .get(engagement_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("engagement", engagement_id))
    }

    async fn load_tasks(&self, engagement_id: &str) -> Result<Vec<TaskRecord>, StoreError> {
        let mut tasks: Vec<TaskRecord> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.engagement_id == engagement_id)
            .cloned()
            .map(normalize_loaded_task)
            .collect();
        tasks.sort_by_key(|t| t.order_key);
        Ok(tasks)
    }

    async fn save_task(&self, task: &TaskRecord) -> Result<TaskRecord, StoreError> {
        if self.failures.trip(FailPoint::SaveTask) {
            return Err(StoreError::backend("injected save_task failure"));
        }
        let mut tasks = self.tasks.write().await;
        if !tasks.contains_key(&task.id) {
            return Err(StoreError::not_found("task", &task.id));
        }
        tasks.insert(task.id.clone(), task.clone());
        Ok(task.clone())
    }

    async fn create_task(&self, draft: TaskDraft) -> Result<TaskRecord, StoreError> {
        if self.failures.trip(FailPoint::CreateTask) {
            return Err(StoreError::backend("injected create_task failure"));
        }
        let mut tasks = self.tasks.write().await;
        let order_key = draft.order_key.unwrap_or_else(|| {
            tasks
                .values()
                .filter(|t| t.engagement_id == draft.engagement_id)
                .map(|t| t.order_key)
                .max()
                .map(|k| k + 1)
                .unwrap_or(0)
        });
        let mut task = TaskRecord {
            id: new_id(),
            engagement_id: draft.engagement_id,
            name: draft.name,
            weight: draft.weight,
            deadline: draft.deadline,
            order_key,
            detail: draft.detail,
            done: false,
        };
        task.sync_done();
        tasks.insert(task.id.clone(), task.clone());
        Ok(task)
    }

    async fn delete_task(&self, task_id: &str) -> Result<(), StoreError> {
        if self.failures.trip(FailPoint::DeleteTask) {
            return Err(StoreError::backend("injected delete_task failure"));
        }
        self.tasks
            .write()
            .await
            .remove(task_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("task", task_id))
    }

    async fn save_engagement(&self, engagement: &Engagement) -> Result<Engagement, StoreError> {
        if self.failures.trip(FailPoint::SaveEngagement) {
            return Err(StoreError::backend("injected save_engagement failure"));
        }
        self.engagements
            .write()
            .await
            .insert(engagement.id.clone(), engagement.clone());
        Ok(engagement.clone())
    }
}

#[async_trait]
impl MemberDirectory for MemoryStore {
    async fn resolve_member(&self, member_id: &str) -> Result<MemberProfile, StoreError> {
        self.members
            .read()
            .await
            .get(member_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("member", member_id))
    }
}
