//! 服务器状态监视器
//!
//! 服务器线程在每次状态变化时通知所有等待者，
//! 等待方必须使用同一个监视器，否则永远观察不到就绪

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// 服务器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Initial,
    Running,
    ShutDown,
}

/// 状态监视器（互斥锁 + 条件变量）
#[derive(Debug)]
pub struct ServerMonitor {
    state: Mutex<ServerState>,
    changed: Condvar,
}

impl ServerMonitor {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ServerState::Initial),
            changed: Condvar::new(),
        }
    }

    pub fn state(&self) -> ServerState {
        *lock_unpoisoned(&self.state)
    }

    pub fn is_running(&self) -> bool {
        self.state() == ServerState::Running
    }

    /// 更新状态并唤醒所有等待者
    pub fn set_state(&self, state: ServerState) {
        let mut guard = lock_unpoisoned(&self.state);
        *guard = state;
        self.changed.notify_all();
    }

    /// 等待服务器离开 `Initial` 状态（无超时）
    ///
    /// 检查与等待在同一把锁下完成，不会丢失通知
    pub fn wait_while_starting(&self) -> ServerState {
        let guard = lock_unpoisoned(&self.state);
        let guard = self
            .changed
            .wait_while(guard, |state| *state == ServerState::Initial)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

impl Default for ServerMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// 获取锁，忽略中毒状态
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_wait_returns_after_running_notification() {
        let monitor = Arc::new(ServerMonitor::new());
        let notifier = monitor.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            notifier.set_state(ServerState::Running);
        });

        assert_eq!(monitor.wait_while_starting(), ServerState::Running);
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_returns_on_shutdown_without_running() {
        let monitor = Arc::new(ServerMonitor::new());
        let notifier = monitor.clone();

        let handle = thread::spawn(move || notifier.set_state(ServerState::ShutDown));

        assert_eq!(monitor.wait_while_starting(), ServerState::ShutDown);
        assert!(!monitor.is_running());
        handle.join().unwrap();
    }
}
