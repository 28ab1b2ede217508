//! Flare Coord Test Library
//!
//! Lifecycle control for an in-process coordination server used by automated tests:
//! synchronous startup (block until genuinely serving), startup failure propagation,
//! and forced, failure-swallowing teardown.

pub mod config;
pub mod controller;
pub mod error;
pub mod server;
pub mod testing;

// Re-exports
pub use config::{QuorumConfig, ServerConfig};
pub use controller::{
    ControllerConfig, ControllerState, EmbeddedServerController, ServerMainFace, StartupLatch,
    max_wait_budget,
};
pub use error::{ErrorCategory, ErrorCode, HarnessResult, Result, ServerError};
pub use server::{
    ConnectionAcceptor, EmbeddedServer, ListeningChannel, PrivilegedAccess, RunningServer,
    ServerMonitor, ServerState, StandaloneServer, StorageHandle,
};
pub use testing::{InstanceSpec, TestingServer};
