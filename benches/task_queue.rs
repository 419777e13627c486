use std::collections::VecDeque;

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pricemon::domain::models::Task;
use pricemon::services::{allocate_and_interleave, even_spread};
use uuid::Uuid;

fn make_tasks(n: usize, priority: u8) -> Vec<Task> {
    (0..n)
        .map(|_| Task::new(Uuid::new_v4(), priority, Utc::now()).unwrap())
        .collect()
}

fn bench_admission(c: &mut Criterion) {
    let high = make_tasks(400, 2);
    let normal = make_tasks(400, 5);
    let low = make_tasks(400, 9);

    c.bench_function("task_queue_allocate_and_interleave", |b| {
        b.iter(|| {
            allocate_and_interleave(black_box(high.clone()), black_box(normal.clone()), black_box(low.clone()), black_box(200))
        })
    });

    let by_retailer: Vec<(String, VecDeque<Task>)> = vec![
        ("amazon".to_string(), make_tasks(200, 3).into()),
        ("fnac".to_string(), make_tasks(100, 4).into()),
        ("darty".to_string(), make_tasks(100, 4).into()),
        ("boulanger".to_string(), make_tasks(100, 4).into()),
    ];

    c.bench_function("task_queue_even_spread", |b| {
        b.iter(|| even_spread(black_box(by_retailer.clone()), black_box(200)))
    });
}

criterion_group!(benches, bench_admission);
criterion_main!(benches);
