use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use workset_pool::{PoolEvent, SharedTask, Task, TaskError, WorkerAddress, WorkerPool};

struct NoopTask(String);

impl Task for NoopTask {
    fn id(&self) -> String {
        self.0.clone()
    }

    fn run_on_worker(&self, _worker: &WorkerAddress) -> Result<(), TaskError> {
        Ok(())
    }
}

fn tasks(count: usize) -> Vec<SharedTask> {
    (0..count)
        .map(|i| Arc::new(NoopTask(format!("task-{}", i))) as SharedTask)
        .collect()
}

fn run_work_set(pool: &WorkerPool, count: usize) {
    let events = pool.begin_new_work_set(tasks(count)).unwrap();
    assert_eq!(events.recv().unwrap(), PoolEvent::Commenced);
    assert_eq!(events.recv().unwrap(), PoolEvent::Completed);
}

fn bench_work_set_throughput(c: &mut Criterion) {
    let pool = WorkerPool::start().unwrap();
    for i in 0..num_workers() {
        pool.register_new_worker(format!("worker-{}", i));
    }

    c.bench_function("work_set_100_tasks", |b| {
        b.iter(|| run_work_set(&pool, black_box(100)))
    });

    pool.shutdown().unwrap();
}

fn bench_start_and_shutdown(c: &mut Criterion) {
    c.bench_function("start_shutdown", |b| {
        b.iter(|| {
            let pool = WorkerPool::start().unwrap();
            pool.shutdown().unwrap();
        })
    });
}

fn num_workers() -> usize {
    8
}

criterion_group!(benches, bench_work_set_throughput, bench_start_and_shutdown);
criterion_main!(benches);
