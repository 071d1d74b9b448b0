use std::fmt;

use crossbeam_channel::Sender;

use crate::engine::{PoolEvent, PoolSnapshot};
use crate::task::TaskError;
use crate::work_set::WorkSet;
use crate::{TaskId, WorkerAddress};

/// Messages processed, in arrival order, by the pool's message loop
pub(crate) enum Message {
    /// A worker announced itself
    RegisterWorker(WorkerAddress),
    /// Admit a new work set once the pool is idle
    BeginWorkSet {
        work_set: WorkSet,
        events: Sender<PoolEvent>,
    },
    TaskCompleted {
        worker: WorkerAddress,
        task_id: TaskId,
    },
    TaskFailed {
        worker: WorkerAddress,
        task_id: TaskId,
        error: TaskError,
    },
    /// Report the loop's current view of the pool
    Snapshot(Sender<PoolSnapshot>),
}

impl Message {
    pub(crate) fn failed(worker: WorkerAddress, task_id: TaskId, error: TaskError) -> Self {
        Message::TaskFailed {
            worker,
            task_id,
            error,
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::RegisterWorker(address) => {
                f.debug_tuple("RegisterWorker").field(address).finish()
            }
            Message::BeginWorkSet { work_set, .. } => f
                .debug_struct("BeginWorkSet")
                .field("id", &work_set.id())
                .field("tasks", &work_set.len())
                .finish(),
            Message::TaskCompleted { worker, task_id } => f
                .debug_struct("TaskCompleted")
                .field("worker", worker)
                .field("task_id", task_id)
                .finish(),
            Message::TaskFailed {
                worker,
                task_id,
                error,
            } => f
                .debug_struct("TaskFailed")
                .field("worker", worker)
                .field("task_id", task_id)
                .field("error", &error.to_string())
                .finish(),
            Message::Snapshot(_) => f.write_str("Snapshot"),
        }
    }
}
