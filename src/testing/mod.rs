//! 测试工具
//!
//! - `InstanceSpec`: 端口、数据目录等实例规格
//! - `TestingServer`: 在独立线程运行并同步等待就绪的测试服务器

pub mod instance;
pub mod server;

pub use instance::{DEFAULT_MAX_CLIENT_CNXNS, DEFAULT_TICK_TIME_MS, InstanceSpec, pick_free_port};
pub use server::TestingServer;
