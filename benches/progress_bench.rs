//! Criterion benchmarks for hot paths in the workflow engine.
//!
//! Run with:
//!   cargo bench
//!
//! Covers:
//!   - progress aggregation (linear scan over the in-scope task set)
//!   - personal list ordering

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use engagekit::engine::ordering;
use engagekit::model::{
    Engagement, EngagementNature, EngagementStatus, TaskDetail, TaskName, TaskRecord,
};
use engagekit::progress;

fn make_engagement() -> Engagement {
    Engagement {
        id: "e1".to_string(),
        name: "Bench engagement".to_string(),
        nature: EngagementNature::Audit,
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

fn make_tasks(count: usize) -> Vec<TaskRecord> {
    (0..count)
        .map(|i| {
            let nature = if i % 3 == 0 {
                EngagementNature::Review
            } else {
                EngagementNature::Audit
            };
            let mut assignment = BTreeMap::new();
            assignment.insert("tina".to_string(), i % 2 == 0);
            assignment.insert("tom".to_string(), i % 5 != 0);
            let mut task = TaskRecord {
                id: format!("t{}", i),
                engagement_id: "e1".to_string(),
                name: TaskName::Custom(format!("task {}", i)),
                weight: (i as u32 % 20) + 1,
                deadline: NaiveDate::from_ymd_opt(2026, 3, (i as u32 % 28) + 1),
                order_key: i as i32,
                detail: TaskDetail::Operational { nature, assignment },
                done: false,
            };
            task.sync_done();
            task
        })
        .collect()
}

fn bench_progress(c: &mut Criterion) {
    let engagement = make_engagement();
    let tasks = make_tasks(200);

    c.bench_function("progress_200_tasks", |b| {
        b.iter(|| {
            let p = progress::progress(black_box(&tasks), black_box(&engagement));
            black_box(p);
        });
    });
}

fn bench_ordering(c: &mut Criterion) {
    let today = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
    let tasks = make_tasks(200);

    c.bench_function("sort_personal_list_200", |b| {
        b.iter(|| {
            let mut list = tasks.clone();
            ordering::sort(black_box(&mut list), today);
            black_box(list);
        });
    });
}

criterion_group!(benches, bench_progress, bench_ordering);
criterion_main!(benches);
