//! 连接接收器
//!
//! 持有监听套接字和所有客户端连接，每个连接分配一个 uuid 会话 ID

use crate::server::monitor::lock_unpoisoned;
use crate::server::standalone::CoordServer;
use crate::server::traits::{ConnectionAcceptor, ListeningChannel, RunningServer};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 关闭监听通道时等待接收循环释放套接字的最长时间
const LISTENER_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// accept 出错（如文件描述符耗尽）后的暂停时间
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// 监听套接字通道
///
/// 套接字由接收循环持有；`close` 取消接收循环并等待套接字真正释放
#[derive(Debug)]
pub struct ListenerChannel {
    token: CancellationToken,
    open: Mutex<bool>,
    closed: Condvar,
}

impl ListenerChannel {
    fn new(token: CancellationToken) -> Self {
        Self {
            token,
            open: Mutex::new(true),
            closed: Condvar::new(),
        }
    }

    fn mark_closed(&self) {
        let mut open = lock_unpoisoned(&self.open);
        *open = false;
        self.closed.notify_all();
    }
}

impl ListeningChannel for ListenerChannel {
    fn close(&self) -> io::Result<()> {
        self.token.cancel();

        let open = lock_unpoisoned(&self.open);
        let (open, _) = self
            .closed
            .wait_timeout_while(open, LISTENER_CLOSE_TIMEOUT, |open| *open)
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if *open {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "listening socket was not released in time",
            ));
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        *lock_unpoisoned(&self.open)
    }
}

/// 接收循环退出（包括被取消）时标记监听通道已关闭
struct ClosedOnDrop(Arc<ListenerChannel>);

impl Drop for ClosedOnDrop {
    fn drop(&mut self) {
        self.0.mark_closed();
    }
}

#[derive(Debug)]
struct ConnectionEntry {
    peer: SocketAddr,
    token: CancellationToken,
}

/// 连接接收器
#[derive(Debug)]
pub struct CnxnAcceptor {
    local_addr: SocketAddr,
    max_client_cnxns: usize,
    shutdown: CancellationToken,
    channel: Arc<ListenerChannel>,
    server: Mutex<Option<Arc<CoordServer>>>,
    connections: Mutex<HashMap<Uuid, ConnectionEntry>>,
}

impl CnxnAcceptor {
    pub(crate) fn new(
        local_addr: SocketAddr,
        max_client_cnxns: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            local_addr,
            max_client_cnxns,
            channel: Arc::new(ListenerChannel::new(shutdown.child_token())),
            shutdown,
            server: Mutex::new(None),
            connections: Mutex::new(HashMap::new()),
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 当前打开的客户端连接数
    pub fn connection_count(&self) -> usize {
        lock_unpoisoned(&self.connections).len()
    }

    pub(crate) fn server(&self) -> Option<Arc<CoordServer>> {
        lock_unpoisoned(&self.server).clone()
    }

    pub(crate) fn set_running_server(&self, server: Arc<CoordServer>) {
        *lock_unpoisoned(&self.server) = Some(server);
    }

    /// 接收连接，直到监听通道关闭或服务器停止
    pub(crate) async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        let _closed = ClosedOnDrop(self.channel.clone());
        let token = self.channel.token.clone();

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => self.register(stream, peer),
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        if !pause_after_accept_error(&token).await {
                            break;
                        }
                    }
                },
            }
        }

        drop(listener);
        info!(address = %self.local_addr, "Listening socket closed");
    }

    fn register(self: &Arc<Self>, stream: TcpStream, peer: SocketAddr) {
        let Some(server) = self.server() else {
            debug!(peer = %peer, "Server not ready, dropping connection");
            return;
        };

        let token = self.shutdown.child_token();
        let session_id = Uuid::new_v4();
        {
            let mut connections = lock_unpoisoned(&self.connections);
            let from_peer = connections
                .values()
                .filter(|c| c.peer.ip() == peer.ip())
                .count();
            if self.max_client_cnxns > 0 && from_peer >= self.max_client_cnxns {
                warn!(
                    peer = %peer,
                    limit = self.max_client_cnxns,
                    "Too many connections from client, closing"
                );
                return;
            }
            connections.insert(
                session_id,
                ConnectionEntry {
                    peer,
                    token: token.clone(),
                },
            );
        }
        debug!(peer = %peer, session_id = %session_id, "Connection accepted");

        let acceptor = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream, token, &server, &acceptor).await {
                debug!(session_id = %session_id, error = %e, "Connection ended with error");
            }
            lock_unpoisoned(&acceptor.connections).remove(&session_id);
            debug!(session_id = %session_id, "Connection closed");
        });
    }
}

/// accept 出错后暂停，避免持续失败时空转；返回 `false` 表示期间已被取消
async fn pause_after_accept_error(token: &CancellationToken) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => true,
    }
}

async fn serve_connection(
    stream: TcpStream,
    token: CancellationToken,
    server: &CoordServer,
    acceptor: &CnxnAcceptor,
) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = tokio::select! {
            _ = token.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };

        let response = server.process_command(&line, acceptor.connection_count());
        writer.write_all(response.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }

    Ok(())
}

impl ConnectionAcceptor for CnxnAcceptor {
    fn close_all_connections(&self) -> io::Result<()> {
        let drained: Vec<ConnectionEntry> = lock_unpoisoned(&self.connections)
            .drain()
            .map(|(_, entry)| entry)
            .collect();
        for entry in &drained {
            entry.token.cancel();
        }
        info!(count = drained.len(), "Closed all client connections");
        Ok(())
    }

    fn listening_channel(&self) -> Option<Arc<dyn ListeningChannel>> {
        Some(self.channel.clone() as Arc<dyn ListeningChannel>)
    }

    fn running_server(&self) -> Option<Arc<dyn RunningServer>> {
        self.server().map(|server| server as Arc<dyn RunningServer>)
    }
}
