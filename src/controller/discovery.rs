//! 内部句柄的有界发现
//!
//! 句柄由启动线程异步发布。无间隔地反复读取，直到出现或超出墙钟预算；
//! 超时返回 `None`，调用方将其视为"不可用"而不是错误

use std::time::{Duration, Instant};

/// 轮询直到 `probe` 返回值或预算耗尽
pub fn poll_until_present<T, F>(budget: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Option<T>,
{
    let start = Instant::now();
    loop {
        if let Some(found) = probe() {
            return Some(found);
        }
        if start.elapsed() >= budget {
            return None;
        }
        std::thread::yield_now();
    }
}
