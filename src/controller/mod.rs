//! 嵌入式服务器生命周期控制
//!
//! 底层服务器没有公开的就绪回调，也没有"强制关闭全部（包括监听套接字）"的操作，
//! 控制器通过以下方式在线程间同步：
//!
//! 1. **启动闩锁**：标记"已尝试启动"，一次打开，任意多个等待者
//! 2. **有界轮询**：以进程级等待预算为上限发现异步出现的内部句柄
//! 3. **服务器监视器**：在服务器自身通知的监视器上等待就绪
//! 4. **尽力关闭**：每个关闭步骤独立隔离，错误只记录日志

pub mod budget;
pub mod config;
pub mod controller;
pub mod discovery;
pub mod face;
pub mod latch;

pub use budget::{MIN_WAIT_BUDGET, max_wait_budget};
pub use config::ControllerConfig;
pub use controller::{ControllerState, EmbeddedServerController};
pub use discovery::poll_until_present;
pub use face::ServerMainFace;
pub use latch::StartupLatch;
