//! 工作节点端RPC服务

use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

use super::{read_frame, write_frame, RpcError, RpcHandler};
use crate::proto::taskpool::{RpcReply, RpcRequest};

/// Accepts connections and routes each request to one [`RpcHandler`].
pub struct RpcServer {
    listener: TcpListener,
    handler: Arc<dyn RpcHandler>,
    shutdown: Arc<Notify>,
}

/// Stops a running [`RpcServer`] from another task or thread.
#[derive(Clone)]
pub struct ServerHandle {
    shutdown: Arc<Notify>,
}

impl ServerHandle {
    pub fn shutdown(&self) {
        // notify_one会保留许可, serve尚未等待时也不会丢失
        self.shutdown.notify_one();
    }
}

impl RpcServer {
    pub async fn bind(addr: &str, handler: Arc<dyn RpcHandler>) -> Result<Self, RpcError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            handler,
            shutdown: Arc::new(Notify::new()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, RpcError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown: Arc::clone(&self.shutdown),
        }
    }

    /// Serve until [`ServerHandle::shutdown`] is called.
    pub async fn serve(self) {
        if let Ok(addr) = self.listener.local_addr() {
            info!("RPC server listening on {}", addr);
        }
        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!("accepted connection from {}", peer);
                        let handler = Arc::clone(&self.handler);
                        tokio::spawn(async move {
                            if let Err(e) = serve_connection(stream, handler).await {
                                warn!("connection from {} ended with error: {}", peer, e);
                            }
                        });
                    }
                    Err(e) => error!("accept failed: {}", e),
                },
                _ = self.shutdown.notified() => {
                    info!("RPC server shutting down");
                    break;
                }
            }
        }
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    handler: Arc<dyn RpcHandler>,
) -> Result<(), RpcError> {
    stream.set_nodelay(true)?;
    while let Some(request) = read_frame::<_, RpcRequest>(&mut stream).await? {
        let handler = Arc::clone(&handler);
        let RpcRequest { method, body } = request;
        // 处理器可能执行耗时的任务, 放到阻塞线程池
        let outcome = tokio::task::spawn_blocking(move || {
            let result = handler.handle(&method, &body);
            (method, result)
        })
        .await;

        let reply = match outcome {
            Ok((_, Ok(body))) => RpcReply {
                ok: true,
                body,
                error: String::new(),
            },
            Ok((method, Err(e))) => {
                debug!("{} failed: {}", method, e);
                RpcReply {
                    ok: false,
                    body: Vec::new(),
                    error: e.to_string(),
                }
            }
            Err(e) => RpcReply {
                ok: false,
                body: Vec::new(),
                error: format!("handler panicked: {}", e),
            },
        };
        write_frame(&mut stream, &reply).await?;
    }
    Ok(())
}
