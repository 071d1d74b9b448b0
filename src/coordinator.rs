//! 协调进程端注册服务 - 工作节点通过RPC向工作池报到

use log::info;
use prost::Message;

use crate::engine::WorkerPool;
use crate::proto::taskpool::{RegisterArgs, RegisterReply};
use crate::rpc::{RemoteCall, RpcError, RpcHandler};

/// RPC method the coordinator serves for worker registration
pub const REGISTER_METHOD: &str = "Coordinator.Register";

/// Forwards registrations to a [`WorkerPool`].
pub struct RegistrationService {
    pool: WorkerPool,
}

impl RegistrationService {
    pub fn new(pool: WorkerPool) -> Self {
        Self { pool }
    }
}

impl RpcHandler for RegistrationService {
    fn handle(&self, method: &str, body: &[u8]) -> Result<Vec<u8>, RpcError> {
        if method != REGISTER_METHOD {
            return Err(RpcError::UnknownMethod(method.to_string()));
        }
        let args = RegisterArgs::decode(body)?;
        info!("registration request from {}", args.address);
        self.pool.register_new_worker(args.address);

        let mut buf = Vec::new();
        RegisterReply::default().encode(&mut buf)?;
        Ok(buf)
    }
}

/// 工作节点端: 向协调进程注册自己的RPC地址
pub fn register_worker(
    rpc: &dyn RemoteCall,
    coordinator: &str,
    worker_address: &str,
) -> Result<(), RpcError> {
    let args = RegisterArgs {
        address: worker_address.to_string(),
    };
    let mut buf = Vec::new();
    args.encode(&mut buf)?;
    let raw = rpc.call(coordinator, REGISTER_METHOD, &buf)?;
    RegisterReply::decode(raw.as_slice())?;
    Ok(())
}
