//! 独立模式的进程内协调服务器
//!
//! 在调用线程上构建 tokio 运行时并阻塞运行，直到 `shutdown` 被调用。
//! 客户端协议为按行的四字命令：
//! - `ruok` → `imok`
//! - `srvr` → 服务器概要
//! - `stat` → 服务器概要 + 连接数
//! - `cons` → 连接数
//! - 其他 → `unknown`

use crate::config::{QuorumConfig, ServerConfig};
use crate::error::Result;
use crate::server::acceptor::CnxnAcceptor;
use crate::server::monitor::{ServerMonitor, ServerState, lock_unpoisoned};
use crate::server::store::DataStore;
use crate::server::traits::{
    ConnectionAcceptor, EmbeddedServer, PrivilegedAccess, RunningServer, StorageHandle,
};
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// 运行中的协调服务器
#[derive(Debug)]
pub struct CoordServer {
    config: ServerConfig,
    local_addr: SocketAddr,
    monitor: ServerMonitor,
    store: Arc<DataStore>,
    started_at: DateTime<Utc>,
    requests: AtomicU64,
}

impl CoordServer {
    fn new(config: ServerConfig, local_addr: SocketAddr, store: Arc<DataStore>) -> Self {
        Self {
            config,
            local_addr,
            monitor: ServerMonitor::new(),
            store,
            started_at: Utc::now(),
            requests: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn data_store(&self) -> &Arc<DataStore> {
        &self.store
    }

    /// 处理一条客户端命令
    pub fn process_command(&self, command: &str, connections: usize) -> String {
        self.requests.fetch_add(1, Ordering::Relaxed);
        match command.trim() {
            "ruok" => "imok".to_string(),
            "srvr" => self.summary(),
            "stat" => format!("{} connections={}", self.summary(), connections),
            "cons" => connections.to_string(),
            _ => "unknown".to_string(),
        }
    }

    fn summary(&self) -> String {
        let uptime = Utc::now() - self.started_at;
        format!(
            "mode=standalone address={} tick_ms={} uptime_ms={} requests={}",
            self.local_addr,
            self.config.tick_time.as_millis(),
            uptime.num_milliseconds(),
            self.requests.load(Ordering::Relaxed)
        )
    }
}

impl RunningServer for CoordServer {
    fn is_running(&self) -> bool {
        self.monitor.is_running()
    }

    fn monitor(&self) -> &ServerMonitor {
        &self.monitor
    }

    fn storage(&self) -> Option<Arc<dyn StorageHandle>> {
        Some(self.store.clone() as Arc<dyn StorageHandle>)
    }
}

/// 独立模式服务器入口
///
/// 每个实例只服务一次；启动前调用 `shutdown` 会让随后的启动立即返回
#[derive(Debug)]
pub struct StandaloneServer {
    shutdown: CancellationToken,
    acceptor: Mutex<Option<Arc<CnxnAcceptor>>>,
}

impl StandaloneServer {
    pub fn new() -> Self {
        Self {
            shutdown: CancellationToken::new(),
            acceptor: Mutex::new(None),
        }
    }

    /// 实际绑定的地址（端口为 0 时由系统分配）
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.acceptor().map(|acceptor| acceptor.local_addr())
    }

    pub fn acceptor(&self) -> Option<Arc<CnxnAcceptor>> {
        lock_unpoisoned(&self.acceptor).clone()
    }

    async fn serve(&self, config: ServerConfig) -> io::Result<()> {
        if self.shutdown.is_cancelled() {
            info!("Shutdown requested before start, not serving");
            return Ok(());
        }

        fs::create_dir_all(&config.data_dir)?;
        let store = Arc::new(DataStore::open(&config.data_log_dir)?);
        let listener = TcpListener::bind(config.client_port_address).await?;
        let local_addr = listener.local_addr()?;

        let acceptor = Arc::new(CnxnAcceptor::new(
            local_addr,
            config.max_client_cnxns,
            self.shutdown.clone(),
        ));
        *lock_unpoisoned(&self.acceptor) = Some(acceptor.clone());

        let server = Arc::new(CoordServer::new(config, local_addr, store.clone()));
        acceptor.set_running_server(server.clone());

        store.record(&format!("startup address={}", local_addr));
        server.monitor().set_state(ServerState::Running);
        info!(address = %local_addr, "🚀 Embedded coordination server started");

        acceptor.accept_loop(listener).await;
        self.shutdown.cancelled().await;

        server.monitor().set_state(ServerState::ShutDown);
        if !store.is_closed() {
            store.record("shutdown");
        }
        info!(address = %local_addr, "Embedded coordination server stopped");
        Ok(())
    }
}

impl Default for StandaloneServer {
    fn default() -> Self {
        Self::new()
    }
}

impl PrivilegedAccess for StandaloneServer {
    fn connection_acceptor(&self) -> Option<Arc<dyn ConnectionAcceptor>> {
        self.acceptor()
            .map(|acceptor| acceptor as Arc<dyn ConnectionAcceptor>)
    }
}

impl EmbeddedServer for StandaloneServer {
    fn configure(&self, config: &QuorumConfig) -> Result<ServerConfig> {
        ServerConfig::read_from(config)
    }

    fn start_blocking(&self, config: ServerConfig) -> io::Result<()> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("coord-server-worker")
            .enable_all()
            .build()?;
        runtime.block_on(self.serve(config))
    }

    /// 停止服务；不会关闭事务日志
    fn shutdown(&self) -> Result<()> {
        self.shutdown.cancel();
        if let Some(server) = self.acceptor().and_then(|acceptor| acceptor.server()) {
            server.monitor().set_state(ServerState::ShutDown);
        }
        info!("Embedded coordination server shutdown requested");
        Ok(())
    }
}
