use std::time::Instant;

use log::debug;
use tokio::net::TcpStream;
use tokio::runtime::{Builder, Runtime};
use tokio::time::{timeout, Duration};

use super::{read_frame, write_frame, RemoteCall, RpcError};
use crate::config::PoolConfig;
use crate::proto::taskpool::{RpcReply, RpcRequest};

/// TCP remote-call client.
///
/// Owns its own runtime; [`RemoteCall::call`] blocks the calling thread and
/// must not be used from inside an async context.
pub struct RpcClient {
    runtime: Runtime,
    call_timeout: Duration,
    connect_timeout: Duration,
}

impl RpcClient {
    pub fn new(config: &PoolConfig) -> Result<Self, RpcError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(config.rpc_threads)
            .thread_name("workset-rpc")
            .enable_all()
            .build()?;
        Ok(Self {
            runtime,
            call_timeout: config.call_timeout(),
            connect_timeout: config.connect_timeout(),
        })
    }

    async fn exchange(
        &self,
        address: &str,
        method: &str,
        body: &[u8],
    ) -> Result<Vec<u8>, RpcError> {
        let started = Instant::now();
        let mut stream = match timeout(self.connect_timeout, TcpStream::connect(address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(RpcError::Connect(address.to_string(), e)),
            Err(_) => {
                return Err(RpcError::Timeout {
                    address: address.to_string(),
                    elapsed: started.elapsed(),
                })
            }
        };
        stream.set_nodelay(true)?;

        let request = RpcRequest {
            method: method.to_string(),
            body: body.to_vec(),
        };
        write_frame(&mut stream, &request).await?;

        match read_frame::<_, RpcReply>(&mut stream).await? {
            Some(reply) if reply.ok => Ok(reply.body),
            Some(reply) => Err(RpcError::Remote(reply.error)),
            None => Err(RpcError::Closed),
        }
    }
}

impl RemoteCall for RpcClient {
    fn call(&self, address: &str, method: &str, request: &[u8]) -> Result<Vec<u8>, RpcError> {
        let start = Instant::now();
        let result = self.runtime.block_on(async {
            match timeout(self.call_timeout, self.exchange(address, method, request)).await {
                Ok(result) => result,
                Err(_) => Err(RpcError::Timeout {
                    address: address.to_string(),
                    elapsed: start.elapsed(),
                }),
            }
        });
        debug!("{} on {} took {:?}", method, address, start.elapsed());
        result
    }
}
