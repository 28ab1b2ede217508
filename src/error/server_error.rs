//! 嵌入式服务器统一错误类型

use super::code::ErrorCode;
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// 嵌入式服务器统一错误类型
///
/// `Startup` 使用 `Arc<io::Error>` 保存原始失败，
/// 同一个失败既从 `run_from_config` 返回，也会再次从 `block_until_started` 返回
#[derive(Error, Debug, Clone)]
pub enum ServerError {
    /// 配置错误（描述符无法转换为服务器配置）
    #[error("配置错误 [{code}]: {reason}")]
    Config { code: ErrorCode, reason: String },

    /// 启动 IO 错误（端口绑定、数据目录等传输层失败）
    #[error("启动失败: {0}")]
    Startup(Arc<io::Error>),

    /// 关闭错误（只记录日志，不向调用方传播）
    #[error("关闭错误 [{code}]: {reason}")]
    Shutdown { code: ErrorCode, reason: String },

    /// 系统错误
    #[error("系统错误: {0}")]
    System(String),
}

impl ServerError {
    /// 创建配置错误
    pub fn config(reason: impl Into<String>) -> Self {
        ServerError::Config {
            code: ErrorCode::ConfigurationInvalid,
            reason: reason.into(),
        }
    }

    /// 创建带错误代码的配置错误
    pub fn config_with_code(code: ErrorCode, reason: impl Into<String>) -> Self {
        ServerError::Config {
            code,
            reason: reason.into(),
        }
    }

    /// 创建启动错误
    pub fn startup(err: io::Error) -> Self {
        ServerError::Startup(Arc::new(err))
    }

    /// 创建关闭错误
    pub fn shutdown(code: ErrorCode, reason: impl Into<String>) -> Self {
        ServerError::Shutdown {
            code,
            reason: reason.into(),
        }
    }

    /// 创建系统错误
    pub fn system(msg: impl Into<String>) -> Self {
        ServerError::System(msg.into())
    }

    // ============================================================
    // 信息获取方法
    // ============================================================

    /// 获取错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            ServerError::Config { code, .. } => *code,
            ServerError::Startup(err) => match err.kind() {
                io::ErrorKind::AddrInUse => ErrorCode::AddressInUse,
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                    ErrorCode::DataDirUnavailable
                }
                _ => ErrorCode::StartupFailed,
            },
            ServerError::Shutdown { code, .. } => *code,
            ServerError::System(_) => ErrorCode::GeneralError,
        }
    }

    /// 是否为启动阶段的 IO 失败
    pub fn is_startup_io(&self) -> bool {
        matches!(self, ServerError::Startup(_))
    }

    /// 启动失败的 IO 错误类型
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            ServerError::Startup(err) => Some(err.kind()),
            _ => None,
        }
    }

    /// 判断两个错误是否为同一个启动失败
    pub fn same_startup_failure(&self, other: &ServerError) -> bool {
        match (self, other) {
            (ServerError::Startup(a), ServerError::Startup(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
