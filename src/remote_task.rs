//! 远程任务 - 通过RPC在工作节点上执行的任务及其工作节点端服务

use std::sync::Arc;

use log::debug;
use prost::Message;

use crate::proto::taskpool::{DoTaskArgs, DoTaskReply, TaskPhase};
use crate::rpc::{RemoteCall, RpcError, RpcHandler};
use crate::task::{SharedTask, Task, TaskError};
use crate::{TaskId, WorkerAddress};

/// RPC method a worker serves to run one task
pub const DO_TASK_METHOD: &str = "Worker.DoTask";

/// A task executed by calling [`DO_TASK_METHOD`] on the assigned worker.
pub struct RemoteTask {
    id: TaskId,
    phase: TaskPhase,
    payload: Vec<u8>,
    rpc: Arc<dyn RemoteCall>,
}

impl RemoteTask {
    pub fn new(
        id: impl Into<TaskId>,
        phase: TaskPhase,
        payload: Vec<u8>,
        rpc: Arc<dyn RemoteCall>,
    ) -> Self {
        Self {
            id: id.into(),
            phase,
            payload,
            rpc,
        }
    }

    pub fn shared(self) -> SharedTask {
        Arc::new(self)
    }

    fn args(&self) -> DoTaskArgs {
        DoTaskArgs {
            task_id: self.id.clone(),
            phase: self.phase as i32,
            payload: self.payload.clone(),
        }
    }
}

impl Task for RemoteTask {
    fn id(&self) -> TaskId {
        self.id.clone()
    }

    fn run_on_worker(&self, worker: &WorkerAddress) -> Result<(), TaskError> {
        let mut buf = Vec::new();
        self.args().encode(&mut buf).map_err(RpcError::from)?;

        let raw = self.rpc.call(worker, DO_TASK_METHOD, &buf)?;
        let reply = DoTaskReply::decode(raw.as_slice()).map_err(RpcError::from)?;
        if reply.ok {
            Ok(())
        } else {
            Err(TaskError::Remote(reply.error))
        }
    }
}

/// Worker-side handler for [`DO_TASK_METHOD`]; `execute` does the actual
/// map or reduce work.
pub struct TaskService<F> {
    execute: F,
}

impl<F> TaskService<F>
where
    F: Fn(&DoTaskArgs) -> Result<(), String> + Send + Sync + 'static,
{
    pub fn new(execute: F) -> Self {
        Self { execute }
    }
}

impl<F> RpcHandler for TaskService<F>
where
    F: Fn(&DoTaskArgs) -> Result<(), String> + Send + Sync + 'static,
{
    fn handle(&self, method: &str, body: &[u8]) -> Result<Vec<u8>, RpcError> {
        if method != DO_TASK_METHOD {
            return Err(RpcError::UnknownMethod(method.to_string()));
        }
        let args = DoTaskArgs::decode(body)?;
        debug!("running {:?} task {}", args.phase(), args.task_id);

        let reply = match (self.execute)(&args) {
            Ok(()) => DoTaskReply {
                ok: true,
                error: String::new(),
            },
            Err(error) => DoTaskReply { ok: false, error },
        };
        let mut buf = Vec::new();
        reply.encode(&mut buf)?;
        Ok(buf)
    }
}
