//! 测试实例规格
//!
//! 端口未指定时，通过绑定再释放的方式挑选一个空闲的临时端口；
//! 数据目录未指定时使用临时目录，随规格一起删除

use crate::config::QuorumConfig;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// 默认 tick 时间（毫秒）
pub const DEFAULT_TICK_TIME_MS: u64 = 2000;

/// 默认单客户端最大连接数
pub const DEFAULT_MAX_CLIENT_CNXNS: usize = 60;

/// 挑选一个空闲端口
pub fn pick_free_port(host: IpAddr) -> io::Result<u16> {
    let listener = TcpListener::bind(SocketAddr::new(host, 0))?;
    Ok(listener.local_addr()?.port())
}

/// 测试实例规格
#[derive(Debug)]
pub struct InstanceSpec {
    host: IpAddr,
    port: u16,
    data_directory: PathBuf,
    temp_dir: Option<TempDir>,
    tick_time_ms: u64,
    max_client_cnxns: usize,
}

impl InstanceSpec {
    /// 创建使用随机端口和临时数据目录的规格
    pub fn new() -> io::Result<Self> {
        let host = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let temp_dir = tempfile::Builder::new().prefix("flare-coord-").tempdir()?;

        Ok(Self {
            host,
            port: pick_free_port(host)?,
            data_directory: temp_dir.path().to_path_buf(),
            temp_dir: Some(temp_dir),
            tick_time_ms: DEFAULT_TICK_TIME_MS,
            max_client_cnxns: DEFAULT_MAX_CLIENT_CNXNS,
        })
    }

    /// 指定端口（0 表示重新挑选空闲端口）
    pub fn with_port(mut self, port: u16) -> io::Result<Self> {
        self.port = if port == 0 {
            pick_free_port(self.host)?
        } else {
            port
        };
        Ok(self)
    }

    /// 使用调用方提供的数据目录（不会被删除）
    pub fn with_data_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_directory = dir.into();
        self.temp_dir = None;
        self
    }

    pub fn with_tick_time_ms(mut self, tick_time_ms: u64) -> Self {
        self.tick_time_ms = tick_time_ms;
        self
    }

    pub fn with_max_client_cnxns(mut self, max: usize) -> Self {
        self.max_client_cnxns = max;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// 客户端连接串 `host:port`
    pub fn connect_string(&self) -> String {
        self.address().to_string()
    }

    pub fn data_directory(&self) -> &Path {
        &self.data_directory
    }

    /// 数据目录是否会随规格删除
    pub fn deletes_data_directory(&self) -> bool {
        self.temp_dir.is_some()
    }

    /// 转换为服务器配置描述符
    pub fn to_config(&self) -> QuorumConfig {
        QuorumConfig::new(self.address(), self.data_directory.clone())
            .with_tick_time_ms(self.tick_time_ms)
            .with_max_client_cnxns(self.max_client_cnxns)
    }

    /// 删除临时数据目录（调用方提供的目录保持不变）
    pub fn delete_data_directory(&mut self) -> io::Result<()> {
        match self.temp_dir.take() {
            Some(temp_dir) => temp_dir.close(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_spec_uses_free_port_and_temp_dir() {
        let spec = InstanceSpec::new().unwrap();
        assert_ne!(spec.port(), 0);
        assert!(spec.data_directory().exists());
        assert!(spec.deletes_data_directory());
        assert_eq!(spec.connect_string(), format!("127.0.0.1:{}", spec.port()));
    }

    #[test]
    fn test_delete_data_directory_removes_temp_dir_once() {
        let mut spec = InstanceSpec::new().unwrap();
        let dir = spec.data_directory().to_path_buf();

        spec.delete_data_directory().unwrap();
        assert!(!dir.exists());
        spec.delete_data_directory().unwrap();
    }

    #[test]
    fn test_caller_directory_is_kept() {
        let caller = tempfile::tempdir().unwrap();
        let mut spec = InstanceSpec::new()
            .unwrap()
            .with_data_directory(caller.path())
            .with_tick_time_ms(100);

        assert!(!spec.deletes_data_directory());
        spec.delete_data_directory().unwrap();
        assert!(caller.path().exists());
        assert_eq!(spec.to_config().tick_time_ms, 100);
    }
}
