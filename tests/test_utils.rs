#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use workset_pool::{
    DoneCallback, PoolEvent, PoolSnapshot, SharedTask, Task, TaskError, WorkerAddress, WorkerPool,
};

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(10);

pub fn init_logger() {
    env_logger::builder().is_test(true).try_init().ok();
}

/// 测试用的假集群, 记录每次任务执行并可让指定节点失败
#[derive(Default)]
pub struct FakeCluster {
    failing: Mutex<HashSet<String>>,
    delay: Duration,
    hold: AtomicBool,
    attempts: Mutex<Vec<(String, String)>>,
    completed: Mutex<Vec<(String, String)>>,
    running: Mutex<HashMap<String, usize>>,
    overlap: AtomicBool,
}

impl FakeCluster {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Default::default()
        })
    }

    pub fn fail_worker(&self, worker: &str) {
        self.failing.lock().insert(worker.to_string());
    }

    /// Keep every task running until [`FakeCluster::release`].
    pub fn hold(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.hold.store(false, Ordering::SeqCst);
    }

    pub fn tasks(self: &Arc<Self>, ids: &[&str]) -> Vec<SharedTask> {
        ids.iter()
            .map(|id| {
                Arc::new(FakeTask {
                    id: id.to_string(),
                    cluster: Arc::clone(self),
                }) as SharedTask
            })
            .collect()
    }

    pub fn attempts(&self) -> Vec<(String, String)> {
        self.attempts.lock().clone()
    }

    pub fn attempts_on(&self, worker: &str) -> usize {
        self.attempts.lock().iter().filter(|(_, w)| w == worker).count()
    }

    pub fn completed(&self) -> Vec<(String, String)> {
        self.completed.lock().clone()
    }

    pub fn completed_task_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.completed.lock().iter().map(|(t, _)| t.clone()).collect();
        ids.sort();
        ids
    }

    /// True if some worker ever ran two tasks at once.
    pub fn saw_overlap(&self) -> bool {
        self.overlap.load(Ordering::SeqCst)
    }

    fn run(&self, task_id: &str, worker: &str) -> Result<(), TaskError> {
        {
            let mut running = self.running.lock();
            let count = running.entry(worker.to_string()).or_insert(0);
            *count += 1;
            if *count > 1 {
                self.overlap.store(true, Ordering::SeqCst);
            }
        }
        self.attempts.lock().push((task_id.to_string(), worker.to_string()));

        thread::sleep(self.delay);
        while self.hold.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(5));
        }

        if let Some(count) = self.running.lock().get_mut(worker) {
            *count -= 1;
        }

        if self.failing.lock().contains(worker) {
            return Err(TaskError::Remote(format!("{} is down", worker)));
        }
        self.completed.lock().push((task_id.to_string(), worker.to_string()));
        Ok(())
    }
}

pub struct FakeTask {
    id: String,
    cluster: Arc<FakeCluster>,
}

impl Task for FakeTask {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn run_on_worker(&self, worker: &WorkerAddress) -> Result<(), TaskError> {
        self.cluster.run(&self.id, worker)
    }
}

/// A task whose implementation loses its callback on one worker.
pub struct ForgetfulTask {
    pub id: String,
    pub forgetful_worker: String,
}

impl Task for ForgetfulTask {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn run_on_worker(&self, _worker: &WorkerAddress) -> Result<(), TaskError> {
        Ok(())
    }

    fn start_on_worker(self: Arc<Self>, worker: WorkerAddress, on_done: DoneCallback) {
        if worker == self.forgetful_worker {
            drop(on_done);
            return;
        }
        on_done(self.run_on_worker(&worker));
    }
}

/// A task that reports a different id every time it is asked.
#[derive(Default)]
pub struct ShiftingIdTask {
    calls: AtomicUsize,
}

impl Task for ShiftingIdTask {
    fn id(&self) -> String {
        format!("shifting-{}", self.calls.fetch_add(1, Ordering::SeqCst))
    }

    fn run_on_worker(&self, _worker: &WorkerAddress) -> Result<(), TaskError> {
        Ok(())
    }
}

pub fn next_event(events: &Receiver<PoolEvent>) -> PoolEvent {
    events
        .recv_timeout(EVENT_TIMEOUT)
        .expect("no pool event before timeout")
}

/// Poll snapshots until `condition` holds.
pub fn wait_for_snapshot<F>(pool: &WorkerPool, condition: F) -> PoolSnapshot
where
    F: Fn(&PoolSnapshot) -> bool,
{
    let deadline = Instant::now() + EVENT_TIMEOUT;
    loop {
        let snapshot = pool.snapshot().expect("snapshot failed");
        if condition(&snapshot) {
            return snapshot;
        }
        if Instant::now() > deadline {
            panic!("condition not reached, last snapshot: {:?}", snapshot);
        }
        thread::sleep(Duration::from_millis(5));
    }
}

pub fn wait_for<F: Fn() -> bool>(condition: F) {
    let deadline = Instant::now() + EVENT_TIMEOUT;
    while !condition() {
        if Instant::now() > deadline {
            panic!("condition not reached before timeout");
        }
        thread::sleep(Duration::from_millis(5));
    }
}
