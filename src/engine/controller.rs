//! Optimistic task mutation with whole-record rollback.
//!
//! The controller owns one engagement's working set. Every mutation follows
//! the same protocol: guard, take the per-task in-flight marker, snapshot
//! the record, apply the new state in memory so derived views reflect it
//! immediately, then persist. A failed persist restores the exact snapshot
//! before the failure is surfaced.
//!
//! All state is instance-owned — several engagements can be tracked by
//! separate controllers without cross-talk. Reads are synchronous over the
//! current in-memory snapshot and never perform I/O; lock critical sections
//! are short and never span an await point, so a reader never observes a
//! half-applied assignment map.

use std::collections::HashSet;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::events::{EngineEvent, EventBus};
use crate::model::{
    AdminPhase, Engagement, TaskCategory, TaskDetail, TaskName, TaskRecord,
};
use crate::policy;
use crate::progress::{self, AggregateProgress};
use crate::store::{EngagementStore, StoreError, TaskDraft};

use super::{decision, ordering, MutationError};

/// Category-bucketed view of the working set. Operational tasks outside the
/// engagement's current nature are not listed.
#[derive(Debug, Clone, Default)]
pub struct TaskBuckets {
    pub operational: Vec<TaskRecord>,
    pub administrative: Vec<TaskRecord>,
}

/// Fields a manager supplies when creating an ad-hoc task.
#[derive(Debug, Clone)]
pub struct ManualTaskDraft {
    pub name: String,
    pub weight: u32,
    pub deadline: Option<NaiveDate>,
    pub detail: TaskDetail,
}

pub struct TaskController {
    store: Arc<dyn EngagementStore>,
    events: EventBus,
    engagement: RwLock<Engagement>,
    tasks: RwLock<Vec<TaskRecord>>,
    /// Task ids with a mutation currently between optimistic apply and
    /// settle. A second request for the same id is refused, not queued.
    in_flight: Mutex<HashSet<String>>,
}

/// Removes the in-flight marker when the mutation settles, on every exit
/// path.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    task_id: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        lock(self.set).remove(&self.task_id);
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TaskController {
    /// Load an engagement and its tasks from the store.
    pub async fn load(
        store: Arc<dyn EngagementStore>,
        engagement_id: &str,
    ) -> Result<Self, StoreError> {
        Self::load_with(store, engagement_id, &EngineConfig::default()).await
    }

    pub async fn load_with(
        store: Arc<dyn EngagementStore>,
        engagement_id: &str,
        config: &EngineConfig,
    ) -> Result<Self, StoreError> {
        let engagement = store.load_engagement(engagement_id).await?;
        let tasks = store.load_tasks(engagement_id).await?;
        info!(
            engagement_id,
            task_count = tasks.len(),
            "engagement working set loaded"
        );
        Ok(Self {
            store,
            events: EventBus::new(config.event_capacity),
            engagement: RwLock::new(engagement),
            tasks: RwLock::new(tasks),
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    // ─── Reads ────────────────────────────────────────────────────────────

    pub fn engagement(&self) -> Engagement {
        self.read_engagement().clone()
    }

    pub fn tasks(&self) -> Vec<TaskRecord> {
        self.read_tasks().clone()
    }

    pub fn task(&self, task_id: &str) -> Option<TaskRecord> {
        self.read_tasks().iter().find(|t| t.id == task_id).cloned()
    }

    pub fn progress(&self) -> AggregateProgress {
        progress::progress(&self.read_tasks(), &self.read_engagement())
    }

    /// Category buckets in creation order.
    pub fn buckets(&self) -> TaskBuckets {
        let engagement = self.read_engagement();
        let mut buckets = TaskBuckets::default();
        for task in self.read_tasks().iter() {
            match task.category() {
                TaskCategory::Operational => {
                    if progress::in_scope(task, &engagement) {
                        buckets.operational.push(task.clone());
                    }
                }
                TaskCategory::Administrative => buckets.administrative.push(task.clone()),
            }
        }
        buckets
    }

    /// The member's personal list, overdue work first.
    pub fn my_tasks(&self, member_id: &str) -> Vec<TaskRecord> {
        self.my_tasks_at(member_id, Utc::now().date_naive())
    }

    pub fn my_tasks_at(&self, member_id: &str, today: NaiveDate) -> Vec<TaskRecord> {
        let engagement = self.read_engagement();
        let tasks = self.read_tasks();
        let mut mine: Vec<TaskRecord> = progress::my_tasks(&tasks, &engagement, member_id)
            .into_iter()
            .cloned()
            .collect();
        ordering::sort(&mut mine, today);
        mine
    }

    pub fn can_edit_decision(&self, user_id: &str) -> bool {
        decision::can_edit(&self.read_engagement(), user_id)
    }

    pub fn can_view_decision(&self, user_id: &str) -> bool {
        decision::can_view(&self.read_engagement(), user_id)
    }

    // ─── Task mutations ───────────────────────────────────────────────────

    /// Manager override: force the whole task done or not-done. Every
    /// assignment entry is set to the new value so individual member state
    /// cannot disagree with the aggregate.
    pub async fn toggle_task_done(
        &self,
        user_id: &str,
        task_id: &str,
    ) -> Result<TaskRecord, MutationError> {
        self.require_manager(user_id, "toggle task completion")?;
        let _guard = self.begin(task_id)?;

        let (snapshot, updated) = {
            let mut tasks = self.write_tasks();
            let task = find_mut(&mut tasks, task_id)?;
            let snapshot = task.clone();
            let target = !task.computed_done();
            match &mut task.detail {
                TaskDetail::Operational { assignment, .. } => {
                    for member_done in assignment.values_mut() {
                        *member_done = target;
                    }
                }
                TaskDetail::Administrative { .. } => {
                    return Err(MutationError::InvalidTarget {
                        task_id: task_id.to_string(),
                        detail: "administrative tasks are driven by phase",
                    })
                }
            }
            task.sync_done();
            (snapshot, task.clone())
        };

        self.settle(snapshot, updated).await
    }

    /// An assigned member flips their own completion entry. The task's
    /// overall state is recomputed from the per-member AND rule, never set
    /// directly.
    pub async fn toggle_own_completion(
        &self,
        user_id: &str,
        task_id: &str,
    ) -> Result<TaskRecord, MutationError> {
        {
            let tasks = self.read_tasks();
            let task = find(&tasks, task_id)?;
            if !policy::can_toggle_own_completion(task, user_id) {
                debug!(user_id, task_id, "own-completion toggle refused");
                return Err(MutationError::Denied {
                    user_id: user_id.to_string(),
                    action: "toggle completion on a task they are not assigned to",
                });
            }
        }
        let _guard = self.begin(task_id)?;

        let (snapshot, updated) = {
            let mut tasks = self.write_tasks();
            let task = find_mut(&mut tasks, task_id)?;
            let snapshot = task.clone();
            match &mut task.detail {
                TaskDetail::Operational { assignment, .. } => {
                    if let Some(member_done) = assignment.get_mut(user_id) {
                        *member_done = !*member_done;
                    }
                }
                TaskDetail::Administrative { .. } => {
                    return Err(MutationError::InvalidTarget {
                        task_id: task_id.to_string(),
                        detail: "administrative tasks have no assignment map",
                    })
                }
            }
            task.sync_done();
            (snapshot, task.clone())
        };

        self.settle(snapshot, updated).await
    }

    /// Manager sets an administrative task to an explicit phase.
    pub async fn set_admin_phase(
        &self,
        user_id: &str,
        task_id: &str,
        phase: AdminPhase,
    ) -> Result<TaskRecord, MutationError> {
        self.apply_phase(user_id, task_id, move |_| phase).await
    }

    /// Manager advances an administrative task along the fixed cycle
    /// NotStarted → InProgress → Done → NotStarted.
    pub async fn cycle_admin_phase(
        &self,
        user_id: &str,
        task_id: &str,
    ) -> Result<TaskRecord, MutationError> {
        self.apply_phase(user_id, task_id, |current| current.advance())
            .await
    }

    async fn apply_phase(
        &self,
        user_id: &str,
        task_id: &str,
        next: impl FnOnce(AdminPhase) -> AdminPhase,
    ) -> Result<TaskRecord, MutationError> {
        self.require_manager(user_id, "change an administrative phase")?;
        let _guard = self.begin(task_id)?;

        let (snapshot, updated) = {
            let mut tasks = self.write_tasks();
            let task = find_mut(&mut tasks, task_id)?;
            let snapshot = task.clone();
            match &mut task.detail {
                TaskDetail::Administrative { phase } => {
                    *phase = next(*phase);
                }
                TaskDetail::Operational { .. } => {
                    return Err(MutationError::InvalidTarget {
                        task_id: task_id.to_string(),
                        detail: "operational tasks have no phase",
                    })
                }
            }
            task.sync_done();
            (snapshot, task.clone())
        };

        self.settle(snapshot, updated).await
    }

    /// Manager creates an ad-hoc task with a free-text name.
    pub async fn create_manual_task(
        &self,
        user_id: &str,
        draft: ManualTaskDraft,
    ) -> Result<TaskRecord, MutationError> {
        self.require_manager(user_id, "create a task")?;
        let engagement_id = self.read_engagement().id.clone();

        let task = self
            .store
            .create_task(TaskDraft {
                engagement_id,
                name: TaskName::Custom(draft.name),
                weight: draft.weight,
                deadline: draft.deadline,
                order_key: None,
                detail: draft.detail,
            })
            .await?;

        self.write_tasks().push(task.clone());
        self.events.emit(EngineEvent::TaskCreated {
            task_id: task.id.clone(),
        });
        self.emit_progress();
        Ok(task)
    }

    /// Delete a manually created task. Catalog tasks cannot be deleted, and
    /// the caller must pass `confirmed = true` after its own confirmation
    /// step. The remote delete runs first; the record only leaves the
    /// working set once the store accepts it.
    pub async fn delete_manual_task(
        &self,
        user_id: &str,
        task_id: &str,
        confirmed: bool,
    ) -> Result<(), MutationError> {
        self.require_manager(user_id, "delete a task")?;
        {
            let tasks = self.read_tasks();
            let task = find(&tasks, task_id)?;
            if !task.name.is_custom() {
                return Err(MutationError::InvalidTarget {
                    task_id: task_id.to_string(),
                    detail: "catalog tasks cannot be deleted",
                });
            }
        }
        if !confirmed {
            return Err(MutationError::ConfirmationRequired {
                task_id: task_id.to_string(),
            });
        }
        let _guard = self.begin(task_id)?;

        self.store.delete_task(task_id).await?;
        self.write_tasks().retain(|t| t.id != task_id);
        self.events.emit(EngineEvent::TaskRemoved {
            task_id: task_id.to_string(),
        });
        self.emit_progress();
        Ok(())
    }

    // ─── Decision ─────────────────────────────────────────────────────────

    /// Record the final approve/reject outcome.
    ///
    /// No optimistic apply here: the updated engagement reaches memory only
    /// after the store accepts it, so a failed persist leaves nothing to
    /// roll back.
    pub async fn decide(
        &self,
        user_id: &str,
        outcome: decision::DecisionOutcome,
        comment: Option<&str>,
    ) -> Result<Engagement, MutationError> {
        let updated = {
            let engagement = self.read_engagement();
            if !decision::can_edit(&engagement, user_id) {
                debug!(user_id, "decision submit refused");
                return Err(MutationError::Denied {
                    user_id: user_id.to_string(),
                    action: "record the engagement decision",
                });
            }
            decision::apply(&engagement, outcome, comment)
        };

        let saved = self.store.save_engagement(&updated).await?;
        *self.write_engagement() = saved.clone();
        info!(engagement_id = %saved.id, status = ?saved.status, "decision recorded");
        self.events.emit(EngineEvent::DecisionRecorded {
            status: saved.status,
        });
        Ok(saved)
    }

    // ─── Internals ────────────────────────────────────────────────────────

    fn require_manager(
        &self,
        user_id: &str,
        action: &'static str,
    ) -> Result<(), MutationError> {
        let engagement = self.read_engagement();
        if policy::can_mutate_task_state(&engagement, user_id) {
            Ok(())
        } else {
            debug!(user_id, action, "task mutation refused");
            Err(MutationError::Denied {
                user_id: user_id.to_string(),
                action,
            })
        }
    }

    /// Mark `task_id` in flight, refusing when a mutation is already
    /// pending for it. The marker is released when the returned guard
    /// drops.
    fn begin(&self, task_id: &str) -> Result<InFlightGuard<'_>, MutationError> {
        let mut in_flight = lock(&self.in_flight);
        if !in_flight.insert(task_id.to_string()) {
            debug!(task_id, "mutation already in flight, refusing");
            return Err(MutationError::InFlight {
                task_id: task_id.to_string(),
            });
        }
        Ok(InFlightGuard {
            set: &self.in_flight,
            task_id: task_id.to_string(),
        })
    }

    /// Persist the optimistic state; restore the snapshot on failure.
    async fn settle(
        &self,
        snapshot: TaskRecord,
        updated: TaskRecord,
    ) -> Result<TaskRecord, MutationError> {
        let result = match self.store.save_task(&updated).await {
            Ok(saved) => {
                self.events.emit(EngineEvent::TaskChanged {
                    task_id: saved.id.clone(),
                });
                Ok(saved)
            }
            Err(err) => {
                warn!(task_id = %snapshot.id, %err, "persist failed, restoring snapshot");
                let mut tasks = self.write_tasks();
                if let Ok(task) = find_mut(&mut tasks, &snapshot.id) {
                    *task = snapshot;
                }
                Err(MutationError::Store(err))
            }
        };
        // Recompute after commit and after rollback alike, so subscribers
        // never hold a percentage from a discarded optimistic state.
        self.emit_progress();
        result
    }

    fn emit_progress(&self) {
        let progress = self.progress();
        self.events.emit(EngineEvent::ProgressChanged {
            percent: progress.percent,
            completed_weight: progress.completed_weight,
            total_weight: progress.total_weight,
        });
    }

    fn read_tasks(&self) -> RwLockReadGuard<'_, Vec<TaskRecord>> {
        self.tasks.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_tasks(&self) -> RwLockWriteGuard<'_, Vec<TaskRecord>> {
        self.tasks.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_engagement(&self) -> RwLockReadGuard<'_, Engagement> {
        self.engagement
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_engagement(&self) -> RwLockWriteGuard<'_, Engagement> {
        self.engagement
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn find<'a>(tasks: &'a [TaskRecord], task_id: &str) -> Result<&'a TaskRecord, MutationError> {
    tasks
        .iter()
        .find(|t| t.id == task_id)
        .ok_or_else(|| MutationError::UnknownTask {
            task_id: task_id.to_string(),
        })
}

fn find_mut<'a>(
    tasks: &'a mut [TaskRecord],
    task_id: &str,
) -> Result<&'a mut TaskRecord, MutationError> {
    tasks
        .iter_mut()
        .find(|t| t.id == task_id)
        .ok_or_else(|| MutationError::UnknownTask {
            task_id: task_id.to_string(),
        })
}
