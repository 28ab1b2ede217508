//! 测试工具面向的服务器入口抽象

use crate::config::QuorumConfig;
use crate::controller::controller::EmbeddedServerController;
use crate::error::Result;
use crate::server::EmbeddedServer;
use std::io;

/// 嵌入式服务器入口
///
/// 约定调用顺序：启动线程 `run_from_config`，测试线程 `block_until_started`，
/// 之后 `kill` 或 `close`（两者都可重复调用）
pub trait ServerMainFace: Send + Sync {
    fn run_from_config(&self, config: &QuorumConfig) -> Result<()>;

    fn block_until_started(&self) -> Result<()>;

    /// 强制关闭，从不失败
    fn kill(&self);

    /// 正常关闭；实际上不会返回错误
    fn close(&self) -> io::Result<()>;
}

impl<S: EmbeddedServer> ServerMainFace for EmbeddedServerController<S> {
    fn run_from_config(&self, config: &QuorumConfig) -> Result<()> {
        EmbeddedServerController::run_from_config(self, config)
    }

    fn block_until_started(&self) -> Result<()> {
        EmbeddedServerController::block_until_started(self)
    }

    fn kill(&self) {
        EmbeddedServerController::kill(self)
    }

    fn close(&self) -> io::Result<()> {
        EmbeddedServerController::close(self)
    }
}
