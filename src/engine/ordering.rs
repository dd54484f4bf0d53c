//! Personal task list ordering.
//!
//! Open overdue work sorts first, other open work next, finished work last.
//! `order_key` breaks ties within a band. This ordering applies only to the
//! personal list; category buckets keep catalog/creation order.

use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::model::TaskRecord;

const PRIORITY_OVERDUE: u8 = 1;
const PRIORITY_OPEN: u8 = 2;
const PRIORITY_DONE: u8 = 3;

/// Priority band for a task as of `today`. Lower sorts first.
pub fn priority(task: &TaskRecord, today: NaiveDate) -> u8 {
    if task.computed_done() {
        return PRIORITY_DONE;
    }
    match task.deadline {
        Some(deadline) if deadline < today => PRIORITY_OVERDUE,
        _ => PRIORITY_OPEN,
    }
}

/// Priority band, then ascending `order_key`.
pub fn compare(a: &TaskRecord, b: &TaskRecord, today: NaiveDate) -> Ordering {
    priority(a, today)
        .cmp(&priority(b, today))
        .then(a.order_key.cmp(&b.order_key))
}

/// Sort a personal task list in place.
pub fn sort(tasks: &mut [TaskRecord], today: NaiveDate) {
    tasks.sort_by(|a, b| compare(a, b, today));
}
