//! 工作池调度引擎
//!
//! [`WorkerPool`] 只是消息循环的线程安全前端: 所有状态变更都经由唯一的
//! 消息循环线程, 由它独占工作节点表和活跃批次. 前台调用只接触 [`admission`]
//! 中受锁保护的准入状态.

pub(crate) mod admission;
pub(crate) mod message;

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver};
use log::{debug, info, warn};
use serde::Serialize;

use crate::config::PoolConfig;
use crate::event_loop::EventLoop;
use crate::task::SharedTask;
use crate::work_set::{WorkSet, WorkSetProgress};
use crate::worker::WorkerState;
use crate::{PoolError, Result, WorkerAddress};

use admission::Shared;
use message::Message;

/// 工作池生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PoolRunState {
    Running,
    /// 不再接受新批次, 注册仍可帮助当前批次
    ShutdownRequested,
    /// 排空已发出的消息, 注册被丢弃
    ShuttingDown,
    ShutDown,
}

/// 批次事件, 经 [`WorkerPool::begin_new_work_set`] 返回的通道送达
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolEvent {
    Commenced,
    Completed,
    /// 工作池正在关闭, 批次未被接受
    Rejected,
}

/// 消息循环视角下的一致快照
#[derive(Debug, Clone, Serialize)]
pub struct PoolSnapshot {
    pub run_state: PoolRunState,
    pub workers: Vec<(WorkerAddress, WorkerState)>,
    pub work_set: Option<WorkSetProgress>,
    pub waiting_work_sets: usize,
}

/// 工作池句柄, 可克隆并在多个线程间共享
///
/// 丢弃句柄不会停止消息循环线程, 需调用 [`WorkerPool::shutdown`]
#[derive(Clone)]
pub struct WorkerPool {
    shared: Arc<Shared>,
}

impl WorkerPool {
    /// 使用默认配置启动工作池
    pub fn start() -> Result<Self> {
        Self::start_with_config(PoolConfig::default())
    }

    pub fn start_with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let (sender, receiver) = unbounded();
        let shared = Arc::new(Shared::new(config, sender));

        let loop_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(shared.config.loop_thread_name.clone())
            .spawn(move || EventLoop::new(loop_shared).run(receiver))
            .map_err(PoolError::Spawn)?;
        shared.lock().loop_handle = Some(handle);

        info!("worker pool started");
        Ok(Self { shared })
    }

    /// 注册新的工作节点
    ///
    /// 不会等待消息循环. 进入ShuttingDown后到达的注册直接丢弃.
    pub fn register_new_worker(&self, address: impl Into<WorkerAddress>) {
        let address = address.into();
        let mut admission = self.shared.lock();
        match admission.state {
            PoolRunState::Running | PoolRunState::ShutdownRequested => {
                if !admission.push(Message::RegisterWorker(address.clone())) {
                    warn!("message loop is gone, registration of {} dropped", address);
                }
            }
            PoolRunState::ShuttingDown | PoolRunState::ShutDown => {
                warn!("pool is {:?}, registration of {} dropped", admission.state, address);
            }
        }
    }

    /// 提交新的任务批次
    ///
    /// 立即返回事件通道. 已有活跃批次时, 新批次在消息循环中排队等待.
    /// 空任务列表或重复标识同步返回错误.
    pub fn begin_new_work_set(&self, tasks: Vec<SharedTask>) -> Result<Receiver<PoolEvent>> {
        let work_set = WorkSet::new(tasks)?;
        let (events, receiver) = unbounded();

        let mut admission = self.shared.lock();
        if admission.state != PoolRunState::Running {
            warn!("pool is {:?}, work set {} rejected", admission.state, work_set.id());
            let _ = events.send(PoolEvent::Rejected);
            return Ok(receiver);
        }

        debug!("submitting work set {} with {} tasks", work_set.id(), work_set.len());
        let rejected = events.clone();
        if !admission.push(Message::BeginWorkSet { work_set, events }) {
            warn!("message loop is gone, work set rejected");
            let _ = rejected.send(PoolEvent::Rejected);
        }
        Ok(receiver)
    }

    /// 优雅关闭工作池
    ///
    /// 阻塞到活跃批次完成且已发出的消息全部处理完毕. 可重复或并发调用,
    /// 后来者等待第一次关闭结束.
    pub fn shutdown(&self) -> Result<()> {
        let shared = &self.shared;
        let mut admission = shared.lock();

        if admission.state != PoolRunState::Running {
            debug!("shutdown already {:?}, waiting for it", admission.state);
            shared.wait_while(&mut admission, |a| a.state != PoolRunState::ShutDown);
            return if admission.loop_panicked {
                Err(PoolError::LoopPanicked)
            } else {
                Ok(())
            };
        }

        admission.state = PoolRunState::ShutdownRequested;
        shared.notify_all();
        info!("shutdown requested, waiting for the active work set");
        shared.wait_while(&mut admission, |a| a.work_set_active && !a.loop_panicked);

        admission.state = PoolRunState::ShuttingDown;
        info!("pool shutting down, draining {} in-flight messages", admission.pending);
        shared.wait_while(&mut admission, |a| a.pending > 0 && !a.loop_panicked);

        admission.close();
        let handle = admission.loop_handle.take();
        drop(admission);

        let joined = handle.map(|h| h.join());

        let mut admission = shared.lock();
        admission.state = PoolRunState::ShutDown;
        let panicked = admission.loop_panicked || matches!(joined, Some(Err(_)));
        admission.loop_panicked = panicked;
        shared.notify_all();
        drop(admission);

        if panicked {
            log::error!("worker pool message loop panicked");
            return Err(PoolError::LoopPanicked);
        }
        info!("worker pool shut down");
        Ok(())
    }

    pub fn run_state(&self) -> PoolRunState {
        self.shared.lock().state
    }

    /// 向消息循环请求当前快照
    pub fn snapshot(&self) -> Result<PoolSnapshot> {
        let (reply, receiver) = crossbeam_channel::bounded(1);
        {
            let mut admission = self.shared.lock();
            if admission.loop_panicked {
                return Err(PoolError::LoopPanicked);
            }
            match admission.state {
                PoolRunState::ShuttingDown | PoolRunState::ShutDown => {
                    return Err(PoolError::ShutDown)
                }
                _ => {}
            }
            if !admission.push(Message::Snapshot(reply)) {
                return Err(PoolError::ShutDown);
            }
        }
        receiver.recv().map_err(|_| PoolError::LoopPanicked)
    }
}
