//! 嵌入式服务器配置
//!
//! `QuorumConfig` 是外部传入的配置描述符，
//! `ServerConfig` 是嵌入式服务器自身使用的配置形态（由 `EmbeddedServer::configure` 生成）

use crate::error::{ErrorCode, Result, ServerError};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// 外部配置描述符
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuorumConfig {
    pub client_port_address: SocketAddr,
    pub data_dir: PathBuf,
    pub data_log_dir: Option<PathBuf>,
    #[serde(default = "default_tick_time_ms")]
    pub tick_time_ms: u64,
    /// 单个客户端地址允许的最大连接数，0 表示不限制
    #[serde(default = "default_max_client_cnxns")]
    pub max_client_cnxns: usize,
    pub min_session_timeout_ms: Option<u64>,
    pub max_session_timeout_ms: Option<u64>,
}

fn default_tick_time_ms() -> u64 {
    2000
}

fn default_max_client_cnxns() -> usize {
    60
}

impl QuorumConfig {
    /// 创建默认配置
    pub fn new(client_port_address: SocketAddr, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            client_port_address,
            data_dir: data_dir.into(),
            data_log_dir: None,
            tick_time_ms: default_tick_time_ms(),
            max_client_cnxns: default_max_client_cnxns(),
            min_session_timeout_ms: None,
            max_session_timeout_ms: None,
        }
    }

    /// 设置 tick 时间
    pub fn with_tick_time_ms(mut self, tick_time_ms: u64) -> Self {
        self.tick_time_ms = tick_time_ms;
        self
    }

    /// 设置最大客户端连接数
    pub fn with_max_client_cnxns(mut self, max: usize) -> Self {
        self.max_client_cnxns = max;
        self
    }

    /// 设置事务日志目录
    pub fn with_data_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_log_dir = Some(dir.into());
        self
    }

    /// 设置会话超时范围
    pub fn with_session_timeouts(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.min_session_timeout_ms = Some(min_ms);
        self.max_session_timeout_ms = Some(max_ms);
        self
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.tick_time_ms == 0 {
            return Err(ServerError::config("tick_time_ms must be greater than zero"));
        }

        let (min, max) = self.session_timeouts_ms();
        if min > max {
            return Err(ServerError::config_with_code(
                ErrorCode::SessionTimeoutInvalid,
                format!(
                    "min_session_timeout_ms ({}) must not exceed max_session_timeout_ms ({})",
                    min, max
                ),
            ));
        }

        Ok(())
    }

    /// 计算会话超时范围（默认 2 倍和 20 倍 tick 时间）
    pub fn session_timeouts_ms(&self) -> (u64, u64) {
        let min = self
            .min_session_timeout_ms
            .unwrap_or(self.tick_time_ms.saturating_mul(2));
        let max = self
            .max_session_timeout_ms
            .unwrap_or(self.tick_time_ms.saturating_mul(20));
        (min, max)
    }
}

/// 嵌入式服务器配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub client_port_address: SocketAddr,
    pub data_dir: PathBuf,
    pub data_log_dir: PathBuf,
    pub tick_time: Duration,
    pub max_client_cnxns: usize,
    pub min_session_timeout: Duration,
    pub max_session_timeout: Duration,
}

impl ServerConfig {
    /// 从外部配置描述符读取
    pub fn read_from(config: &QuorumConfig) -> Result<Self> {
        config.validate()?;

        let (min_ms, max_ms) = config.session_timeouts_ms();
        Ok(Self {
            client_port_address: config.client_port_address,
            data_dir: config.data_dir.clone(),
            data_log_dir: config
                .data_log_dir
                .clone()
                .unwrap_or_else(|| config.data_dir.clone()),
            tick_time: Duration::from_millis(config.tick_time_ms),
            max_client_cnxns: config.max_client_cnxns,
            min_session_timeout: Duration::from_millis(min_ms),
            max_session_timeout: Duration::from_millis(max_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> QuorumConfig {
        QuorumConfig::new("127.0.0.1:0".parse().unwrap(), "/tmp/coord")
    }

    #[test]
    fn test_defaults_resolve_session_timeouts_from_tick_time() {
        let server = ServerConfig::read_from(&base().with_tick_time_ms(100)).unwrap();
        assert_eq!(server.min_session_timeout, Duration::from_millis(200));
        assert_eq!(server.max_session_timeout, Duration::from_millis(2000));
        assert_eq!(server.data_log_dir, PathBuf::from("/tmp/coord"));
    }

    #[test]
    fn test_rejects_zero_tick_time() {
        let err = ServerConfig::read_from(&base().with_tick_time_ms(0)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigurationInvalid);
    }

    #[test]
    fn test_rejects_inverted_session_timeouts() {
        let err = base().with_session_timeouts(5000, 1000).validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::SessionTimeoutInvalid);
    }
}
