//! 控制器配置模块

use super::budget::max_wait_budget;
use std::time::Duration;

/// 控制器配置
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// 就绪检测后的固定稳定等待（默认 1 秒）
    pub settle_delay: Duration,
    /// 句柄发现的最长轮询时间（默认使用进程级等待预算）
    pub max_wait: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(1),
            max_wait: max_wait_budget(),
        }
    }
}

impl ControllerConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置稳定等待时间
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// 设置句柄发现的最长轮询时间
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }
}
