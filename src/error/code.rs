//! 错误代码和错误类别定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 错误代码枚举
///
/// 错误代码按类别分组，每个类别占用1000个代码范围：
/// - 1000-1999: 配置相关错误
/// - 2000-2999: 启动相关错误
/// - 3000-3999: 关闭（teardown）相关错误
/// - 9000-9999: 通用错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ErrorCode {
    // ============================================================
    // 配置相关错误 (1000-1999)
    // ============================================================
    ConfigurationInvalid = 1000,
    SessionTimeoutInvalid = 1001,

    // ============================================================
    // 启动相关错误 (2000-2999)
    // ============================================================
    StartupFailed = 2000,
    AddressInUse = 2001,
    DataDirUnavailable = 2002,

    // ============================================================
    // 关闭相关错误 (3000-3999)
    // ============================================================
    ShutdownFailed = 3000,
    ConnectionCloseFailed = 3001,
    ListenerCloseFailed = 3002,
    StorageCloseFailed = 3003,

    // ============================================================
    // 通用错误 (9000-9999)
    // ============================================================
    GeneralError = 9000,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ErrorCode {
    /// 获取错误代码的数字值
    #[inline]
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// 从数字值创建错误代码
    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            1000 => Some(ErrorCode::ConfigurationInvalid),
            1001 => Some(ErrorCode::SessionTimeoutInvalid),
            2000 => Some(ErrorCode::StartupFailed),
            2001 => Some(ErrorCode::AddressInUse),
            2002 => Some(ErrorCode::DataDirUnavailable),
            3000 => Some(ErrorCode::ShutdownFailed),
            3001 => Some(ErrorCode::ConnectionCloseFailed),
            3002 => Some(ErrorCode::ListenerCloseFailed),
            3003 => Some(ErrorCode::StorageCloseFailed),
            9000 => Some(ErrorCode::GeneralError),
            _ => None,
        }
    }

    /// 获取错误代码的英文标识符
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigurationInvalid => "CONFIGURATION_INVALID",
            ErrorCode::SessionTimeoutInvalid => "SESSION_TIMEOUT_INVALID",
            ErrorCode::StartupFailed => "STARTUP_FAILED",
            ErrorCode::AddressInUse => "ADDRESS_IN_USE",
            ErrorCode::DataDirUnavailable => "DATA_DIR_UNAVAILABLE",
            ErrorCode::ShutdownFailed => "SHUTDOWN_FAILED",
            ErrorCode::ConnectionCloseFailed => "CONNECTION_CLOSE_FAILED",
            ErrorCode::ListenerCloseFailed => "LISTENER_CLOSE_FAILED",
            ErrorCode::StorageCloseFailed => "STORAGE_CLOSE_FAILED",
            ErrorCode::GeneralError => "GENERAL_ERROR",
        }
    }

    /// 获取错误代码的类别（用于错误分类）
    pub fn category(&self) -> ErrorCategory {
        match self.as_u32() {
            1000..=1999 => ErrorCategory::Configuration,
            2000..=2999 => ErrorCategory::Startup,
            3000..=3999 => ErrorCategory::Teardown,
            _ => ErrorCategory::General,
        }
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Configuration,
    Startup,
    Teardown,
    General,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "CONFIGURATION"),
            ErrorCategory::Startup => write!(f, "STARTUP"),
            ErrorCategory::Teardown => write!(f, "TEARDOWN"),
            ErrorCategory::General => write!(f, "GENERAL"),
        }
    }
}
