//! 启动闩锁
//!
//! 一次性门：初始关闭，打开后不再关闭，所有等待者同时被释放

use crate::server::monitor::lock_unpoisoned;
use std::sync::{Condvar, Mutex, PoisonError};

/// 启动闩锁（"已尝试启动"信号）
#[derive(Debug, Default)]
pub struct StartupLatch {
    open: Mutex<bool>,
    opened: Condvar,
}

impl StartupLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// 打开闩锁
    ///
    /// 返回本次调用是否真正打开了闩锁
    pub fn open(&self) -> bool {
        let mut open = lock_unpoisoned(&self.open);
        if *open {
            return false;
        }
        *open = true;
        self.opened.notify_all();
        true
    }

    pub fn is_open(&self) -> bool {
        *lock_unpoisoned(&self.open)
    }

    /// 阻塞直到闩锁打开（无超时）
    pub fn wait(&self) {
        let open = lock_unpoisoned(&self.open);
        let _open = self
            .opened
            .wait_while(open, |open| !*open)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_opens_exactly_once() {
        let latch = StartupLatch::new();
        assert!(!latch.is_open());
        assert!(latch.open());
        assert!(!latch.open());
        assert!(latch.is_open());
        latch.wait();
    }

    #[test]
    fn test_releases_all_waiters() {
        let latch = Arc::new(StartupLatch::new());
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let latch = latch.clone();
                thread::spawn(move || latch.wait())
            })
            .collect();

        latch.open();
        for waiter in waiters {
            waiter.join().unwrap();
        }
    }
}
