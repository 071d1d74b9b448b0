//! 消息循环 - 唯一修改工作节点表和当前批次的线程

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info, warn};

use crate::dispatch::Dispatcher;
use crate::engine::admission::Shared;
use crate::engine::message::Message;
use crate::engine::{PoolEvent, PoolRunState, PoolSnapshot};
use crate::task::{SharedTask, TaskError};
use crate::work_set::WorkSet;
use crate::worker::WorkerTable;
use crate::{TaskId, WorkerAddress};

/// The work set currently being processed
struct ActiveWorkSet {
    work_set: WorkSet,
    started_at: Instant,
}

pub(crate) struct EventLoop {
    shared: Arc<Shared>,
    workers: WorkerTable,
    active: Option<ActiveWorkSet>,
    /// Submissions waiting for the active work set to finish, oldest first
    waiting: VecDeque<(WorkSet, Sender<PoolEvent>)>,
    dispatcher: Dispatcher,
}

/// Marks the loop dead if its thread unwinds, so foreground waiters wake up.
struct PanicGuard(Arc<Shared>);

impl Drop for PanicGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("worker pool message loop panicked, pool is unusable");
            self.0.loop_died();
        }
    }
}

impl EventLoop {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        let dispatcher = Dispatcher::new(Arc::clone(&shared));
        Self {
            shared,
            workers: WorkerTable::new(),
            active: None,
            waiting: VecDeque::new(),
            dispatcher,
        }
    }

    /// Handle messages until the channel is closed by shutdown.
    pub(crate) fn run(mut self, receiver: Receiver<Message>) {
        let _guard = PanicGuard(Arc::clone(&self.shared));
        debug!("message loop running");

        for message in receiver.iter() {
            debug!("handling {:?}", message);
            self.handle(message);
            self.shared.message_handled();
        }

        debug!("message loop exited");
    }

    fn handle(&mut self, message: Message) {
        match message {
            Message::RegisterWorker(address) => self.on_register(address),
            Message::BeginWorkSet { work_set, events } => self.on_begin(work_set, events),
            Message::TaskCompleted { worker, task_id } => self.on_completed(worker, task_id),
            Message::TaskFailed {
                worker,
                task_id,
                error,
            } => self.on_failed(worker, task_id, error),
            Message::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn on_register(&mut self, address: WorkerAddress) {
        if !self.workers.register(&address) {
            debug!("worker {} already known, registration ignored", address);
            return;
        }
        info!("worker {} registered", address);
        self.try_assign(&address);
    }

    fn on_begin(&mut self, work_set: WorkSet, events: Sender<PoolEvent>) {
        if self.shared.lock().state != PoolRunState::Running {
            warn!("pool is shutting down, work set {} rejected", work_set.id());
            let _ = events.send(PoolEvent::Rejected);
            return;
        }
        if self.active.is_some() {
            debug!("work set {} waits for the active one", work_set.id());
            self.waiting.push_back((work_set, events));
            return;
        }
        self.admit(work_set, events);
    }

    /// Admit a work set if the pool is still running, otherwise reject it.
    fn admit(&mut self, work_set: WorkSet, events: Sender<PoolEvent>) {
        let admitted = {
            let mut admission = self.shared.lock();
            let running = admission.state == PoolRunState::Running;
            admission.work_set_active = running;
            self.shared.notify_all();
            running
        };
        if !admitted {
            warn!("pool is shutting down, work set {} rejected", work_set.id());
            let _ = events.send(PoolEvent::Rejected);
            return;
        }
        self.commence(work_set, events);
    }

    fn commence(&mut self, mut work_set: WorkSet, events: Sender<PoolEvent>) {
        info!("work set {} commenced with {} tasks", work_set.id(), work_set.len());
        work_set.commence(events);
        self.active = Some(ActiveWorkSet {
            work_set,
            started_at: Instant::now(),
        });

        for worker in self.workers.free_workers() {
            self.try_assign(&worker);
        }
    }

    fn on_completed(&mut self, worker: WorkerAddress, task_id: TaskId) {
        let Some(active) = self.active.as_mut() else {
            panic!("task {} completed on {} with no active work set", task_id, worker);
        };
        active.work_set.mark_complete(&task_id);
        self.workers.mark_free(&worker, &task_id);
        debug!("task {} completed on {}", task_id, worker);

        if active.work_set.is_completed() {
            self.finish_active();
        } else {
            self.try_assign(&worker);
        }
    }

    fn on_failed(&mut self, worker: WorkerAddress, task_id: TaskId, error: TaskError) {
        let Some(active) = self.active.as_mut() else {
            panic!("task {} failed on {} with no active work set", task_id, worker);
        };
        warn!("worker {} failed on task {}: {}", worker, task_id, error);
        self.workers.mark_failed(&worker, &task_id);
        active.work_set.mark_not_started(&task_id);

        // 孤儿任务交给任意空闲节点; 没有空闲节点时等待下一次注册或完成事件
        let Some(task) = active.work_set.task(&task_id) else {
            return;
        };
        match self.workers.first_free() {
            Some(free) => self.assign(&free, task),
            None => debug!("no free worker, task {} waits", task_id),
        }
    }

    fn finish_active(&mut self) {
        let Some(finished) = self.active.take() else {
            return;
        };
        info!(
            "work set {} completed in {:?}",
            finished.work_set.id(),
            finished.started_at.elapsed()
        );
        finished.work_set.fire_completion();

        // 清除活跃标志与准入下一批次在同一临界区内完成, shutdown不会插入其间
        let next = {
            let mut admission = self.shared.lock();
            let next = if admission.state == PoolRunState::Running {
                self.waiting.pop_front()
            } else {
                None
            };
            admission.work_set_active = next.is_some();
            self.shared.notify_all();
            next
        };

        match next {
            Some((work_set, events)) => self.commence(work_set, events),
            None => self.reject_waiting(),
        }
    }

    fn reject_waiting(&mut self) {
        for (work_set, events) in self.waiting.drain(..) {
            warn!("pool is shutting down, queued work set {} rejected", work_set.id());
            let _ = events.send(PoolEvent::Rejected);
        }
    }

    /// Give `worker` a not-yet-started task of the active work set, if both
    /// exist.
    fn try_assign(&mut self, worker: &str) {
        let Some(active) = self.active.as_ref() else {
            return;
        };
        if !active.work_set.is_started() || !self.workers.is_free(worker) {
            return;
        }
        let next = active.work_set.next_unassigned_task();
        match next {
            Some(task) => self.assign(worker, task),
            None => debug!("nothing left to assign to {}", worker),
        }
    }

    fn assign(&mut self, worker: &str, task: SharedTask) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let task_id = task.id();
        active.work_set.mark_in_progress(&task_id);
        self.workers.mark_busy(worker, &task_id);
        debug!("task {} assigned to {}", task_id, worker);
        self.dispatcher.assign(task, worker.to_string());
    }

    fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            run_state: self.shared.lock().state,
            workers: self.workers.entries(),
            work_set: self.active.as_ref().map(|a| a.work_set.progress()),
            waiting_work_sets: self.waiting.len(),
        }
    }
}
