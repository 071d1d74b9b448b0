//! 远程调用原语
//!
//! One request/reply exchange per call. Frames are a big-endian `u32`
//! length followed by a protobuf message.

mod client;
mod server;

use std::io;
use std::time::Duration;

use bytes::BytesMut;
use prost::Message;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub use client::RpcClient;
pub use server::{RpcServer, ServerHandle};

/// 单帧最大长度
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// 网络通信错误类型
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("failed to connect to {0}: {1}")]
    Connect(String, #[source] io::Error),

    #[error("call to {address} timed out after {elapsed:?}")]
    Timeout { address: String, elapsed: Duration },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Protobuf encode error: {0}")]
    Encode(#[from] prost::EncodeError),

    #[error("frame of {0} bytes exceeds the limit")]
    FrameTooLarge(usize),

    #[error("connection closed before a reply arrived")]
    Closed,

    #[error("unknown method {0}")]
    UnknownMethod(String),

    #[error("remote error: {0}")]
    Remote(String),
}

/// Synchronous remote procedure call.
///
/// Implementations must be callable from many threads at once, must only
/// return `Ok` once the remote side has finished, and must resolve in
/// bounded time.
pub trait RemoteCall: Send + Sync {
    fn call(&self, address: &str, method: &str, request: &[u8]) -> Result<Vec<u8>, RpcError>;
}

/// 服务端方法处理器
pub trait RpcHandler: Send + Sync + 'static {
    fn handle(&self, method: &str, body: &[u8]) -> Result<Vec<u8>, RpcError>;
}

/// 写入一帧
pub async fn write_frame<W, M>(writer: &mut W, message: &M) -> Result<(), RpcError>
where
    W: AsyncWrite + Unpin,
    M: Message,
{
    let mut buf = Vec::with_capacity(message.encoded_len());
    message.encode(&mut buf)?;
    if buf.len() > MAX_FRAME_LEN {
        return Err(RpcError::FrameTooLarge(buf.len()));
    }
    writer.write_u32(buf.len() as u32).await?;
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// 读取一帧, 对端在帧边界关闭连接时返回 `None`
pub async fn read_frame<R, M>(reader: &mut R) -> Result<Option<M>, RpcError>
where
    R: AsyncRead + Unpin,
    M: Message + Default,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if len > MAX_FRAME_LEN {
        return Err(RpcError::FrameTooLarge(len));
    }
    let mut buf = BytesMut::zeroed(len);
    reader.read_exact(&mut buf).await?;
    Ok(Some(M::decode(buf.freeze())?))
}
