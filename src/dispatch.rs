//! 任务分发 - 在独立线程上执行任务, 把结果转换为消息送回消息循环

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use log::{debug, error, warn};

use crate::engine::admission::Shared;
use crate::engine::message::Message;
use crate::task::{DoneCallback, SharedTask, TaskError};
use crate::{TaskId, WorkerAddress};

pub(crate) struct Dispatcher {
    shared: Arc<Shared>,
    /// 分发线程序号, 线程名只使用前缀和序号
    next_thread: u64,
}

impl Dispatcher {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            next_thread: 0,
        }
    }

    /// 在独立线程上执行任务, 不阻塞调用方
    pub(crate) fn assign(&mut self, task: SharedTask, worker: WorkerAddress) {
        let task_id = task.id();
        let completion = Completion {
            shared: Arc::clone(&self.shared),
            worker: worker.clone(),
            task_id: Some(task_id.clone()),
        };
        let on_done: DoneCallback = Box::new(move |result| completion.report(result));

        // 任务标识可能含有NUL等字符, 不能放进线程名
        let name = format!("{}-{}", self.shared.config.dispatch_thread_prefix, self.next_thread);
        self.next_thread += 1;
        debug!("dispatching task {:?} to {} on thread {}", task_id, worker, name);
        let spawned = thread::Builder::new().name(name).spawn(move || {
            let start = Instant::now();
            task.start_on_worker(worker, on_done);
            debug!("dispatch thread finished in {:?}", start.elapsed());
        });

        // 线程创建失败时闭包被丢弃, Completion的Drop会上报失败
        if let Err(e) = spawned {
            error!("failed to spawn dispatch thread for task {:?}: {}", task_id, e);
        }
    }
}

/// Delivers a task's outcome to the loop exactly once. Dropping it unreported
/// counts as a failure, so a worker is never left busy forever.
struct Completion {
    shared: Arc<Shared>,
    worker: WorkerAddress,
    task_id: Option<TaskId>,
}

impl Completion {
    fn report(mut self, result: Result<(), TaskError>) {
        self.deliver(result);
    }

    fn deliver(&mut self, result: Result<(), TaskError>) {
        let Some(task_id) = self.task_id.take() else {
            return;
        };
        let worker = self.worker.clone();
        let message = match result {
            Ok(()) => Message::TaskCompleted { worker, task_id },
            Err(error) => Message::failed(worker, task_id, error),
        };
        if !self.shared.enqueue(message) {
            warn!("pool closed, outcome from {} dropped", self.worker);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.deliver(Err(TaskError::Abandoned));
    }
}
