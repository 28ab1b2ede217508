//! 嵌入式服务器生命周期控制器
//!
//! 提供：
//! - 同步启动（阻塞直到真正就绪，而不只是 start 返回）
//! - 启动失败传播给等待线程
//! - 即使服务器自身关闭不完整，也能确定性地强制关闭

use std::any::Any;
use std::fmt::Display;
use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::{debug, error, info};

use crate::config::QuorumConfig;
use crate::controller::config::ControllerConfig;
use crate::controller::discovery::poll_until_present;
use crate::controller::latch::StartupLatch;
use crate::error::{ErrorCode, Result, ServerError, log_teardown};
use crate::server::monitor::lock_unpoisoned;
use crate::server::{ConnectionAcceptor, EmbeddedServer, RunningServer, StandaloneServer};

/// 控制器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    NotStarted,
    /// 正在配置，闩锁尚未打开
    Starting,
    /// 闩锁已打开，是否失败未知
    Started,
    Ready,
    Failed,
    /// 终止状态
    Closed,
}

/// 嵌入式服务器生命周期控制器
///
/// 典型用法：启动线程调用 `run_from_config`（阻塞整个服务期），
/// 测试线程调用 `block_until_started`，之后调用 `kill` 或 `close`
///
/// # 使用示例
/// ```rust,no_run
/// use flare_coord_test::{EmbeddedServerController, QuorumConfig};
/// use std::sync::Arc;
/// use std::thread;
///
/// let controller = Arc::new(EmbeddedServerController::standalone());
/// let config = QuorumConfig::new("127.0.0.1:0".parse().unwrap(), "/tmp/coord-data");
///
/// let starter = controller.clone();
/// let handle = thread::spawn(move || starter.run_from_config(&config));
///
/// controller.block_until_started()?;
/// // ... 使用服务器 ...
/// controller.close()?;
/// let _ = handle.join();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct EmbeddedServerController<S: EmbeddedServer = StandaloneServer> {
    server: S,
    latch: StartupLatch,
    startup_failure: Mutex<Option<ServerError>>,
    teardown_faults: Mutex<Vec<ServerError>>,
    state: Mutex<ControllerState>,
    config: ControllerConfig,
}

impl EmbeddedServerController<StandaloneServer> {
    /// 使用独立模式服务器创建控制器
    pub fn standalone() -> Self {
        Self::new(StandaloneServer::new())
    }
}

impl<S: EmbeddedServer> EmbeddedServerController<S> {
    pub fn new(server: S) -> Self {
        Self::with_config(server, ControllerConfig::default())
    }

    pub fn with_config(server: S, config: ControllerConfig) -> Self {
        Self {
            server,
            latch: StartupLatch::new(),
            startup_failure: Mutex::new(None),
            teardown_faults: Mutex::new(Vec::new()),
            state: Mutex::new(ControllerState::NotStarted),
            config,
        }
    }

    /// 被控制的嵌入式服务器
    pub fn server(&self) -> &S {
        &self.server
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn state(&self) -> ControllerState {
        *lock_unpoisoned(&self.state)
    }

    /// 关闭步骤中被吞掉的错误（按发生顺序）
    pub fn teardown_faults(&self) -> Vec<ServerError> {
        lock_unpoisoned(&self.teardown_faults).clone()
    }

    /// 启动闩锁是否已打开
    pub fn start_attempted(&self) -> bool {
        self.latch.is_open()
    }

    /// 运行服务器（阻塞整个服务期，需在独立线程调用）
    ///
    /// 闩锁在调用底层启动之前打开，只表示"已尝试启动"。
    /// 底层启动的 IO 失败会被记录，并原样返回给调用方
    pub fn run_from_config(&self, config: &QuorumConfig) -> Result<()> {
        self.transition(ControllerState::Starting);

        let server_config = match self.server.configure(config) {
            Ok(server_config) => server_config,
            Err(e) => {
                error!(error = %e, "❌ Embedded server configuration rejected");
                self.transition(ControllerState::Failed);
                return Err(e);
            }
        };

        if self.latch.open() {
            debug!("Startup latch opened");
        }
        self.transition(ControllerState::Started);

        info!(
            address = %server_config.client_port_address,
            data_dir = %server_config.data_dir.display(),
            "🚀 Starting embedded server"
        );

        match self.server.start_blocking(server_config) {
            Ok(()) => {
                info!("Embedded server exited");
                Ok(())
            }
            Err(e) => {
                let failure = ServerError::startup(e);
                error!(error = %failure, code = %failure.code(), "❌ Embedded server failed to start");
                *lock_unpoisoned(&self.startup_failure) = Some(failure.clone());
                Err(failure)
            }
        }
    }

    /// 阻塞直到服务器真正开始服务或确定启动失败
    ///
    /// 1. 等待启动闩锁（无超时）
    /// 2. 有界发现连接接收器
    /// 3. 有界发现运行中服务器句柄
    /// 4. 若未运行，在服务器自身的监视器上等待状态变化
    /// 5. 固定的稳定等待
    /// 6. 若记录了启动失败，返回该失败
    pub fn block_until_started(&self) -> Result<()> {
        self.latch.wait();

        match self.discover_acceptor() {
            Some(acceptor) => match self.discover_running_server(acceptor.as_ref()) {
                Some(server) => {
                    if !server.is_running() {
                        let state = server.monitor().wait_while_starting();
                        debug!(state = ?state, "Embedded server left initial state");
                    }
                }
                None => debug!("Running server handle not available, skipping readiness wait"),
            },
            None => debug!("Connection acceptor not available, skipping readiness wait"),
        }

        thread::sleep(self.config.settle_delay);

        let failure = lock_unpoisoned(&self.startup_failure).clone();
        if let Some(failure) = failure {
            self.transition(ControllerState::Failed);
            return Err(failure);
        }

        self.transition(ControllerState::Ready);
        info!("✅ Embedded server is ready");
        Ok(())
    }

    /// 强制关闭
    ///
    /// 关闭所有客户端连接和监听套接字，然后执行 `close`。
    /// 所有错误只记录日志，从不返回
    pub fn kill(&self) {
        info!("Killing embedded server");

        let acceptor = self
            .teardown_step("locate_acceptor", ErrorCode::ShutdownFailed, || {
                Ok::<_, ServerError>(self.server.connection_acceptor())
            })
            .flatten();

        if let Some(acceptor) = acceptor {
            self.teardown_step(
                "close_all_connections",
                ErrorCode::ConnectionCloseFailed,
                || acceptor.close_all_connections(),
            );

            let channel = self
                .teardown_step(
                    "locate_listening_channel",
                    ErrorCode::ListenerCloseFailed,
                    || Ok::<_, ServerError>(acceptor.listening_channel()),
                )
                .flatten();
            match channel {
                Some(channel) => {
                    self.teardown_step(
                        "close_listening_channel",
                        ErrorCode::ListenerCloseFailed,
                        || channel.close(),
                    );
                }
                None => debug!("Listening channel not available"),
            }
        }

        self.teardown_step("close", ErrorCode::ShutdownFailed, || self.close());
    }

    /// 正常关闭
    ///
    /// 调用服务器自身的关闭流程，然后显式关闭持久化存储
    /// （底层关闭流程不会可靠地释放日志文件）。
    /// 所有错误只记录日志；签名保留 IO 错误以兼容可关闭资源的抽象
    pub fn close(&self) -> io::Result<()> {
        self.teardown_step("shutdown", ErrorCode::ShutdownFailed, || {
            self.server.shutdown()
        });

        self.teardown_step(
            "close_storage",
            ErrorCode::StorageCloseFailed,
            || -> io::Result<()> {
                let Some(acceptor) = self.discover_acceptor() else {
                    return Ok(());
                };
                let Some(server) = self.discover_running_server(acceptor.as_ref()) else {
                    return Ok(());
                };
                if let Some(storage) = server.storage() {
                    storage.close()?;
                    debug!("Persistent storage closed");
                }
                Ok(())
            },
        );

        self.transition(ControllerState::Closed);
        info!("Embedded server closed");
        Ok(())
    }

    fn discover_acceptor(&self) -> Option<Arc<dyn ConnectionAcceptor>> {
        poll_until_present(self.config.max_wait, || self.server.connection_acceptor())
    }

    fn discover_running_server(
        &self,
        acceptor: &dyn ConnectionAcceptor,
    ) -> Option<Arc<dyn RunningServer>> {
        poll_until_present(self.config.max_wait, || acceptor.running_server())
    }

    /// 执行一个关闭步骤：错误和 panic 都按步骤归类为关闭错误，只记录不返回
    ///
    /// 每个步骤独立隔离，前一步失败不影响后续步骤执行
    fn teardown_step<T, E, F>(&self, step: &str, code: ErrorCode, f: F) -> Option<T>
    where
        E: Display,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let fault = match catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(e)) => ServerError::shutdown(code, format!("{}: {}", step, e)),
            Err(payload) => ServerError::shutdown(
                code,
                format!("{} panicked: {}", step, panic_message(payload.as_ref())),
            ),
        };
        log_teardown(step, &fault);
        lock_unpoisoned(&self.teardown_faults).push(fault);
        None
    }

    /// `Closed` 为终止状态
    fn transition(&self, next: ControllerState) {
        let mut state = lock_unpoisoned(&self.state);
        if *state != ControllerState::Closed {
            *state = next;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
