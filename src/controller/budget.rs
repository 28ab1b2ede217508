//! 进程级等待预算
//!
//! 服务器内部会解析本机主机名，在某些环境中非常慢。
//! 首次使用时预先解析一次，以耗时的两倍作为所有轮询的上限（最少 1 秒）

use std::net::ToSocketAddrs;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// 等待预算下限
pub const MIN_WAIT_BUDGET: Duration = Duration::from_millis(1000);

static MAX_WAIT_BUDGET: LazyLock<Duration> = LazyLock::new(calibrate);

/// 进程级最大等待预算
pub fn max_wait_budget() -> Duration {
    *MAX_WAIT_BUDGET
}

fn calibrate() -> Duration {
    let start = Instant::now();
    let host = local_hostname();
    if let Err(e) = (host.as_str(), 0).to_socket_addrs() {
        debug!(host = %host, error = %e, "Local hostname resolution failed");
    }

    let budget = budget_from_elapsed(start.elapsed());
    info!(host = %host, budget_ms = budget.as_millis(), "Max wait budget calibrated");
    budget
}

pub(crate) fn budget_from_elapsed(elapsed: Duration) -> Duration {
    elapsed.saturating_mul(2).max(MIN_WAIT_BUDGET)
}

fn local_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
