//! Benchmarks for the task scheduler.
//!
//! Benchmarks cover:
//! - Registration throughput with mixed priorities
//! - Dispatch/complete cycles through the ready queue
//! - Dependency chains and fan-in graphs
//! - End-to-end execution through a worker pool

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use agent_task_core::config::{SchedulerConfig, WorkerPoolConfig};
use agent_task_core::core::{
    AppResult, DispatchedTask, Priority, TaskExecutor, TaskScheduler, TaskSpec, WorkerPool,
};

use async_trait::async_trait;

// ============================================================================
// Test Payload and Executor
// ============================================================================

#[derive(Clone)]
struct BenchExecutor;

#[async_trait]
impl TaskExecutor<u64, u64> for BenchExecutor {
    async fn execute(&self, task: DispatchedTask<u64>) -> AppResult<u64> {
        // Simulate minimal work
        Ok(task.payload.wrapping_mul(31))
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn scheduler(max_concurrent: usize) -> TaskScheduler<u64, u64> {
    TaskScheduler::new(SchedulerConfig::default().with_max_concurrent(max_concurrent)).unwrap()
}

fn priority_for(i: u64) -> Priority {
    match i % 4 {
        0 => Priority::Critical,
        1 => Priority::High,
        2 => Priority::Normal,
        _ => Priority::Low,
    }
}

fn drain(s: &TaskScheduler<u64, u64>) -> u64 {
    let mut count = 0;
    while let Some(task) = s.get_next_task(usize::MAX) {
        s.complete_task(&task.id, task.payload);
        count += 1;
    }
    count
}

// ============================================================================
// Scheduler Benchmarks
// ============================================================================

fn bench_add_task(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_task");

    for size in [100_u64, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let s = scheduler(4);
                for i in 0..size {
                    s.add_task(TaskSpec::new(format!("t{i}"), i).with_priority(priority_for(i)))
                        .unwrap();
                }
                black_box(s.get_stats());
            });
        });
    }
    group.finish();
}

fn bench_dispatch_complete(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_complete");

    for size in [100_u64, 1_000, 5_000] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let s = scheduler(4);
                for i in 0..size {
                    s.add_task(TaskSpec::new(format!("t{i}"), i).with_priority(priority_for(i)))
                        .unwrap();
                }
                black_box(drain(&s));
            });
        });
    }
    group.finish();
}

fn bench_dependency_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("dependency_chain");

    for depth in [10_u64, 100, 500] {
        group.throughput(Throughput::Elements(depth));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| {
                let s = scheduler(1);
                s.add_task(TaskSpec::new("t0", 0)).unwrap();
                for i in 1..depth {
                    s.add_task(TaskSpec::new(format!("t{i}"), i).depends_on(format!("t{}", i - 1)))
                        .unwrap();
                }
                black_box(drain(&s));
            });
        });
    }
    group.finish();
}

fn bench_fan_in(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_in");

    for width in [10_u64, 100, 1_000] {
        group.throughput(Throughput::Elements(width + 1));
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.iter(|| {
                let s = scheduler(8);
                let deps: Vec<String> = (0..width).map(|i| format!("leaf-{i}")).collect();
                s.add_task(TaskSpec::new("root", 0).with_dependencies(deps.clone()))
                    .unwrap();
                for (i, id) in (0..width).zip(deps) {
                    s.add_task(TaskSpec::new(id, i)).unwrap();
                }
                black_box(drain(&s));
            });
        });
    }
    group.finish();
}

// ============================================================================
// End-to-End Benchmarks
// ============================================================================

fn bench_worker_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("worker_pool");
    group.sample_size(10);

    for workers in [1_usize, 4] {
        group.throughput(Throughput::Elements(500));
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, &workers| {
            b.iter(|| {
                let s = Arc::new(scheduler(workers));
                let pool = WorkerPool::new(
                    Arc::clone(&s),
                    BenchExecutor,
                    WorkerPoolConfig::new()
                        .with_worker_count(workers)
                        .with_idle_poll_interval(Duration::from_millis(1)),
                )
                .unwrap();
                let _guard = pool.start().unwrap();

                let ids: Vec<String> = (0..500).map(|i| format!("t{i}")).collect();
                for (i, id) in (0_u64..).zip(&ids) {
                    s.add_task(TaskSpec::new(id.clone(), i)).unwrap();
                }
                let outcomes = s.wait_for_completion(&ids, Some(Duration::from_secs(30))).unwrap();
                black_box(outcomes.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_add_task,
    bench_dispatch_complete,
    bench_dependency_chain,
    bench_fan_in,
    bench_worker_pool
);
criterion_main!(benches);
