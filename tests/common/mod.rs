//! 集成测试公共工具
//!
//! 假的嵌入式服务器用于真实服务器无法按需制造的场景：
//! 句柄从不出现、就绪很慢、关闭步骤出错或 panic

#![allow(dead_code)]

use flare_coord_test::{
    ConnectionAcceptor, ControllerConfig, EmbeddedServer, ListeningChannel, PrivilegedAccess,
    QuorumConfig, RunningServer, ServerConfig, ServerError, ServerMonitor, ServerState,
    StorageHandle,
};
use flare_coord_test::error::ErrorCode;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

/// 安装测试日志（`RUST_LOG` 控制级别）
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// 测试用的快速控制器配置
pub fn fast_config() -> ControllerConfig {
    ControllerConfig::new()
        .with_settle_delay(Duration::from_millis(50))
        .with_max_wait(Duration::from_millis(300))
}

pub fn quorum_config(data_dir: &std::path::Path) -> QuorumConfig {
    QuorumConfig::new("127.0.0.1:0".parse().unwrap(), data_dir).with_tick_time_ms(100)
}

/// 发送一条命令并读取一行响应
pub fn send_command(addr: SocketAddr, command: &str) -> io::Result<String> {
    let mut stream = TcpStream::connect(addr)?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    stream.write_all(format!("{}\n", command).as_bytes())?;

    let mut line = String::new();
    BufReader::new(stream).read_line(&mut line)?;
    Ok(line.trim_end().to_string())
}

/// 打开一个已完成一次往返的客户端连接
pub fn open_client(addr: SocketAddr) -> io::Result<BufReader<TcpStream>> {
    let mut stream = TcpStream::connect(addr)?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    stream.write_all(b"ruok\n")?;

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    assert_eq!(line.trim_end(), "imok");
    Ok(reader)
}

/// 读取直到对端关闭连接
pub fn is_closed_by_peer(reader: &mut BufReader<TcpStream>) -> bool {
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) => true,
        Ok(_) => false,
        Err(e) => e.kind() != io::ErrorKind::WouldBlock && e.kind() != io::ErrorKind::TimedOut,
    }
}

// -------- Fake collaborator --------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeBehavior {
    /// 发布所有句柄，延迟后进入运行状态，直到 shutdown
    Healthy { running_delay: Duration },
    /// 启动立即以给定 IO 错误失败
    FailStart(io::ErrorKind),
    /// 从不发布任何句柄
    NoHandles,
    /// 只发布连接接收器
    AcceptorOnly,
    /// 正常启动，但所有关闭步骤出错或 panic
    Faulty,
}

#[derive(Default)]
pub struct FakeStorage {
    faulty: bool,
    closed: AtomicBool,
    pub close_attempts: AtomicUsize,
}

impl StorageHandle for FakeStorage {
    fn close(&self) -> io::Result<()> {
        self.close_attempts.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        if self.faulty {
            return Err(io::Error::other("log file flush failed"));
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct FakeRunning {
    monitor: ServerMonitor,
    pub storage: Arc<FakeStorage>,
}

impl RunningServer for FakeRunning {
    fn is_running(&self) -> bool {
        self.monitor.is_running()
    }

    fn monitor(&self) -> &ServerMonitor {
        &self.monitor
    }

    fn storage(&self) -> Option<Arc<dyn StorageHandle>> {
        Some(self.storage.clone() as Arc<dyn StorageHandle>)
    }
}

#[derive(Default)]
pub struct FakeChannel {
    faulty: bool,
    open: AtomicBool,
    pub close_attempts: AtomicUsize,
}

impl ListeningChannel for FakeChannel {
    fn close(&self) -> io::Result<()> {
        self.close_attempts.fetch_add(1, Ordering::SeqCst);
        if self.faulty {
            panic!("listening socket already released");
        }
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

pub struct FakeAcceptor {
    faulty: bool,
    running: Mutex<Option<Arc<FakeRunning>>>,
    pub channel: Arc<FakeChannel>,
    pub connections_closed: AtomicUsize,
}

impl FakeAcceptor {
    pub fn running(&self) -> Option<Arc<FakeRunning>> {
        self.running.lock().unwrap().clone()
    }
}

impl ConnectionAcceptor for FakeAcceptor {
    fn close_all_connections(&self) -> io::Result<()> {
        self.connections_closed.fetch_add(1, Ordering::SeqCst);
        if self.faulty {
            return Err(io::Error::other("connection reset"));
        }
        Ok(())
    }

    fn listening_channel(&self) -> Option<Arc<dyn ListeningChannel>> {
        Some(self.channel.clone() as Arc<dyn ListeningChannel>)
    }

    fn running_server(&self) -> Option<Arc<dyn RunningServer>> {
        self.running()
            .map(|running| running as Arc<dyn RunningServer>)
    }
}

pub struct FakeServer {
    behavior: FakeBehavior,
    acceptor: Mutex<Option<Arc<FakeAcceptor>>>,
    stopped: Mutex<bool>,
    stop_signal: Condvar,
    pub shutdown_calls: AtomicUsize,
}

impl FakeServer {
    pub fn new(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            acceptor: Mutex::new(None),
            stopped: Mutex::new(false),
            stop_signal: Condvar::new(),
            shutdown_calls: AtomicUsize::new(0),
        }
    }

    pub fn acceptor(&self) -> Option<Arc<FakeAcceptor>> {
        self.acceptor.lock().unwrap().clone()
    }

    fn publish_acceptor(&self, with_running: bool) -> Arc<FakeAcceptor> {
        let faulty = self.behavior == FakeBehavior::Faulty;
        let running = with_running.then(|| {
            Arc::new(FakeRunning {
                monitor: ServerMonitor::new(),
                storage: Arc::new(FakeStorage {
                    faulty,
                    ..Default::default()
                }),
            })
        });
        let acceptor = Arc::new(FakeAcceptor {
            faulty,
            running: Mutex::new(running),
            channel: Arc::new(FakeChannel {
                faulty,
                open: AtomicBool::new(true),
                ..Default::default()
            }),
            connections_closed: AtomicUsize::new(0),
        });
        *self.acceptor.lock().unwrap() = Some(acceptor.clone());
        acceptor
    }

    fn wait_for_stop(&self) {
        let stopped = self.stopped.lock().unwrap();
        let _stopped = self.stop_signal.wait_while(stopped, |s| !*s).unwrap();
    }
}

impl PrivilegedAccess for FakeServer {
    fn connection_acceptor(&self) -> Option<Arc<dyn ConnectionAcceptor>> {
        self.acceptor()
            .map(|acceptor| acceptor as Arc<dyn ConnectionAcceptor>)
    }
}

impl EmbeddedServer for FakeServer {
    fn configure(&self, config: &QuorumConfig) -> flare_coord_test::Result<ServerConfig> {
        ServerConfig::read_from(config)
    }

    fn start_blocking(&self, _config: ServerConfig) -> io::Result<()> {
        match self.behavior {
            FakeBehavior::FailStart(kind) => return Err(io::Error::new(kind, "bind failed")),
            FakeBehavior::NoHandles => {}
            FakeBehavior::AcceptorOnly => {
                self.publish_acceptor(false);
            }
            FakeBehavior::Healthy { running_delay } => {
                let acceptor = self.publish_acceptor(true);
                thread::sleep(running_delay);
                if let Some(running) = acceptor.running() {
                    running.monitor.set_state(ServerState::Running);
                }
            }
            FakeBehavior::Faulty => {
                let acceptor = self.publish_acceptor(true);
                if let Some(running) = acceptor.running() {
                    running.monitor.set_state(ServerState::Running);
                }
            }
        }
        self.wait_for_stop();
        Ok(())
    }

    fn shutdown(&self) -> flare_coord_test::Result<()> {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        *self.stopped.lock().unwrap() = true;
        self.stop_signal.notify_all();

        if let Some(running) = self.acceptor().and_then(|a| a.running()) {
            running.monitor.set_state(ServerState::ShutDown);
        }
        if self.behavior == FakeBehavior::Faulty {
            return Err(ServerError::shutdown(
                ErrorCode::ShutdownFailed,
                "request processor did not stop",
            ));
        }
        Ok(())
    }
}
