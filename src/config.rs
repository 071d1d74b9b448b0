//! 工作池配置

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 配置错误类型
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Invalid(String),
}

/// Worker pool settings. Every field has a default, so a partial JSON
/// document is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Name of the thread running the message loop
    pub loop_thread_name: String,
    /// 分发线程名为 `<prefix>-<序号>`
    pub dispatch_thread_prefix: String,
    /// Upper bound on one remote call, after which it counts as failed
    pub call_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    /// Worker threads of the runtime driving [`crate::RpcClient`]
    pub rpc_threads: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            loop_thread_name: "workset-pool-loop".to_string(),
            dispatch_thread_prefix: "workset-dispatch".to_string(),
            call_timeout_ms: 10_000,
            connect_timeout_ms: 2_000,
            rpc_threads: num_cpus::get(),
        }
    }
}

impl PoolConfig {
    /// 从JSON解析并校验配置
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: PoolConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loop_thread_name.is_empty() {
            return Err(ConfigError::Invalid("loop_thread_name must not be empty".into()));
        }
        if self.loop_thread_name.contains('\0') {
            return Err(ConfigError::Invalid("loop_thread_name must not contain NUL".into()));
        }
        if self.dispatch_thread_prefix.contains('\0') {
            return Err(ConfigError::Invalid("dispatch_thread_prefix must not contain NUL".into()));
        }
        if self.call_timeout_ms == 0 {
            return Err(ConfigError::Invalid("call_timeout_ms must be positive".into()));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid("connect_timeout_ms must be positive".into()));
        }
        if self.rpc_threads == 0 {
            return Err(ConfigError::Invalid("rpc_threads must be positive".into()));
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
