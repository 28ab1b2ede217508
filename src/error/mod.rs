//! Flare Coord Test 错误处理模块
//!
//! 启动错误向调用方传播；关闭阶段的错误只记录日志

pub mod code;
pub mod conversions;
pub mod server_error;

pub use code::{ErrorCategory, ErrorCode};
pub use server_error::{Result, ServerError};

/// 测试工具边界使用的结果类型
pub type HarnessResult<T> = anyhow::Result<T>;

/// 记录并丢弃关闭阶段的错误
pub fn log_teardown(step: &str, err: &ServerError) {
    tracing::warn!(
        step = step,
        code = %err.code(),
        category = %err.code().category(),
        error = %err,
        "⚠️ Teardown step failed, ignoring"
    );
}
