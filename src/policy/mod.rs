//! `policy` — mutation and decision authorization rules.
//!
//! All guards are pure predicates over already-loaded records. Denial is a
//! refusal returned to the caller; a failed guard never reaches storage.

pub mod guard;

pub use guard::{
    can_mutate_task_state, can_toggle_own_completion, is_approver, is_manager_of,
};
