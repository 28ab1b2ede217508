//! 嵌入式协调服务器模块
//!
//! - `traits`: 控制器依赖的协作方契约（含特权访问接口）
//! - `standalone`: 进程内独立模式服务器实现

pub mod acceptor;
pub mod monitor;
pub mod standalone;
pub mod store;
pub mod traits;

pub use acceptor::{CnxnAcceptor, ListenerChannel};
pub use monitor::{ServerMonitor, ServerState};
pub use standalone::{CoordServer, StandaloneServer};
pub use store::DataStore;
pub use traits::{
    ConnectionAcceptor, EmbeddedServer, ListeningChannel, PrivilegedAccess, RunningServer,
    StorageHandle,
};
