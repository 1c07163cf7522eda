// Copyright 2026 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use criterion::{Criterion, criterion_group, criterion_main};
use filament::{ThreadPool, block_on, spawn};

fn spawn_join_1k_single_threaded(c: &mut Criterion) {
    let pool = ThreadPool::new(1);
    let executor = pool.executor();

    const TASKS: usize = 1_000;

    c.bench_function("spawn_join_1k_single_threaded", |b| {
        b.iter(|| {
            block_on(&executor, async {
                let tasks: Vec<_> = (0..TASKS).map(|i| spawn(async move { i })).collect();
                let mut sum = 0;
                for task in tasks {
                    sum += task.await.unwrap();
                }
                sum
            })
        });
    });
}

fn spawn_join_1k_multi_threaded(c: &mut Criterion) {
    let pool = ThreadPool::new(4);
    let executor = pool.executor();

    const TASKS: usize = 1_000;

    c.bench_function("spawn_join_1k_multi_threaded", |b| {
        b.iter(|| {
            block_on(&executor, async {
                let tasks: Vec<_> = (0..TASKS).map(|i| spawn(async move { i })).collect();
                let mut sum = 0;
                for task in tasks {
                    sum += task.await.unwrap();
                }
                sum
            })
        });
    });
}

criterion_group!(spawn_benches, spawn_join_1k_single_threaded, spawn_join_1k_multi_threaded);
criterion_main!(spawn_benches);
