//! 任务契约 - 调度器只关心任务标识和"在某个工作节点上执行, 完成后回调"

use std::sync::Arc;

use crate::rpc::RpcError;
use crate::{TaskId, WorkerAddress};

/// 任务执行错误
#[derive(thiserror::Error, Debug)]
pub enum TaskError {
    #[error("remote call failed: {0}")]
    Rpc(#[from] RpcError),

    #[error("worker reported failure: {0}")]
    Remote(String),

    /// The completion callback was dropped without ever being invoked.
    #[error("task outcome was never reported")]
    Abandoned,
}

/// One-shot completion callback handed to [`Task::start_on_worker`].
pub type DoneCallback = Box<dyn FnOnce(Result<(), TaskError>) + Send + 'static>;

/// Tasks are shared between the work set and the dispatch thread running them.
pub type SharedTask = Arc<dyn Task>;

/// A unit of remotely executable work.
///
/// Implementations must be idempotent: after a worker failure the same task
/// is run again on another worker.
pub trait Task: Send + Sync + 'static {
    /// Stable identifier, unique within a work set.
    fn id(&self) -> TaskId;

    /// Run the task on `worker` and return once the remote side has finished.
    ///
    /// Must resolve in bounded time; a timeout is reported like any other
    /// failure.
    fn run_on_worker(&self, worker: &WorkerAddress) -> Result<(), TaskError>;

    /// Start the task on `worker` and invoke `on_done` exactly once with the
    /// outcome.
    ///
    /// 默认实现会阻塞: 在调用线程上执行 [`Task::run_on_worker`], 回调之后才返回.
    /// The pool supplies the thread, calling this from a fresh dispatch thread
    /// per assignment. Direct callers that must not block need their own
    /// thread, or an override with an asynchronous path that returns early.
    fn start_on_worker(self: Arc<Self>, worker: WorkerAddress, on_done: DoneCallback) {
        let result = self.run_on_worker(&worker);
        on_done(result);
    }
}
