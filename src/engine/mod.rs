//! `engine` — the task and decision workflow core.
//!
//! - **Controller** — applies optimistic task mutations with whole-record
//!   rollback and per-task in-flight locking.
//! - **Decision** — the approve/reject rules gating the engagement outcome.
//! - **Ordering** — priority rules for a member's personal task list.

pub mod controller;
pub mod decision;
pub mod ordering;

use thiserror::Error;

use crate::store::StoreError;

/// Why a mutation request did not commit.
///
/// `Denied` and `InFlight` are local refusals: nothing was attempted
/// remotely and the working set is untouched. Callers treat `InFlight` as a
/// no-op rather than an error banner. `Store` surfaces only after the
/// optimistic state has been rolled back to its pre-mutation snapshot.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error("user '{user_id}' is not permitted to {action}")]
    Denied { user_id: String, action: &'static str },

    #[error("task '{task_id}' already has a mutation in flight")]
    InFlight { task_id: String },

    #[error("task '{task_id}' is not in the working set")]
    UnknownTask { task_id: String },

    #[error("task '{task_id}' does not support this operation: {detail}")]
    InvalidTarget { task_id: String, detail: &'static str },

    /// Deleting a task needs an explicit confirmation from the caller.
    #[error("deletion of task '{task_id}' requires confirmation")]
    ConfirmationRequired { task_id: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
