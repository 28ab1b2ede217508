//! 嵌入式服务器协作方契约
//!
//! 服务器本身不公开"是否就绪"或"强制关闭监听套接字"的接口，
//! 适配器必须通过 `PrivilegedAccess` 原生暴露连接接收器和运行中服务器句柄，
//! 这些句柄在启动线程推进过程中异步出现

use crate::config::{QuorumConfig, ServerConfig};
use crate::error::Result;
use crate::server::monitor::ServerMonitor;
use std::io;
use std::sync::Arc;

/// 嵌入式服务器
pub trait EmbeddedServer: PrivilegedAccess + Send + Sync {
    /// 将外部配置描述符转换为服务器自身配置
    fn configure(&self, config: &QuorumConfig) -> Result<ServerConfig>;

    /// 阻塞运行服务器，直到服务器停止或启动失败
    ///
    /// 必须在独立线程中调用
    fn start_blocking(&self, config: ServerConfig) -> io::Result<()>;

    /// 尽力停止服务器
    fn shutdown(&self) -> Result<()>;
}

/// 特权访问接口
///
/// 返回 `None` 表示句柄尚未出现（或该实现没有此句柄）
pub trait PrivilegedAccess {
    fn connection_acceptor(&self) -> Option<Arc<dyn ConnectionAcceptor>>;
}

/// 连接接收器（持有监听套接字和所有客户端连接）
pub trait ConnectionAcceptor: Send + Sync {
    /// 关闭所有打开的客户端连接
    fn close_all_connections(&self) -> io::Result<()>;

    /// 原始监听通道
    fn listening_channel(&self) -> Option<Arc<dyn ListeningChannel>>;

    /// 接收器持有的运行中服务器句柄
    fn running_server(&self) -> Option<Arc<dyn RunningServer>>;
}

/// 原始监听套接字通道
pub trait ListeningChannel: Send + Sync {
    fn close(&self) -> io::Result<()>;

    fn is_open(&self) -> bool;
}

/// 运行中服务器句柄
pub trait RunningServer: Send + Sync {
    fn is_running(&self) -> bool;

    /// 服务器线程通知状态变化所使用的监视器
    fn monitor(&self) -> &ServerMonitor;

    /// 持久化日志/数据库句柄
    fn storage(&self) -> Option<Arc<dyn StorageHandle>>;
}

/// 持久化存储句柄
pub trait StorageHandle: Send + Sync {
    fn close(&self) -> io::Result<()>;

    fn is_closed(&self) -> bool;
}
