//! WorkSet Pool 核心库入口
//!
//! 协调进程侧的工作节点池调度引擎: 接收工作节点注册, 按批次(work set)
//! 分发任务, 检测节点失败并重新分配任务, 保证批次逐个执行完毕.

mod event_loop;
mod dispatch;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod proto;
pub mod remote_task;
pub mod rpc;
pub mod task;
pub mod work_set;
pub mod worker;

/// 任务标识类型, 在一个work set内唯一
pub type TaskId = String;

/// 工作节点地址类型
pub type WorkerAddress = String;

/// 通用错误类型
#[derive(thiserror::Error, Debug)]
pub enum PoolError {
    #[error("work set must contain at least one task")]
    EmptyWorkSet,

    #[error("duplicate task id in work set: {0}")]
    DuplicateTask(TaskId),

    #[error("worker pool is shut down")]
    ShutDown,

    #[error("worker pool message loop panicked")]
    LoopPanicked,

    #[error("failed to spawn message loop thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("invalid pool configuration: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, PoolError>;

// 公开导出模块的公共接口
pub use config::{ConfigError, PoolConfig};
pub use coordinator::{register_worker, RegistrationService};
pub use engine::{PoolEvent, PoolRunState, PoolSnapshot, WorkerPool};
pub use remote_task::{RemoteTask, TaskService};
pub use rpc::{RemoteCall, RpcClient, RpcError, RpcHandler, RpcServer, ServerHandle};
pub use task::{DoneCallback, SharedTask, Task, TaskError};
pub use work_set::{TaskStatus, WorkSet, WorkSetId, WorkSetProgress};
pub use worker::{WorkerState, WorkerTable};
