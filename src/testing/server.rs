//! 测试用服务器
//!
//! 在名为 `embedded-server` 的独立线程上运行服务器，
//! 调用线程阻塞到服务器就绪或启动失败

use crate::controller::{ControllerConfig, EmbeddedServerController};
use crate::error::{HarnessResult, Result, ServerError};
use crate::server::{RunningServer, StandaloneServer};
use crate::testing::instance::InstanceSpec;
use anyhow::Context;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

type Controller = EmbeddedServerController<StandaloneServer>;

/// 测试用嵌入式服务器
pub struct TestingServer {
    spec: InstanceSpec,
    controller_config: ControllerConfig,
    controller: Option<Arc<Controller>>,
    start_thread: Option<JoinHandle<Result<()>>>,
}

impl TestingServer {
    /// 创建（不启动）
    pub fn new(spec: InstanceSpec) -> Self {
        Self::with_controller_config(spec, ControllerConfig::default())
    }

    pub fn with_controller_config(spec: InstanceSpec, controller_config: ControllerConfig) -> Self {
        Self {
            spec,
            controller_config,
            controller: None,
            start_thread: None,
        }
    }

    /// 使用随机端口和临时目录创建并启动
    pub fn start_new() -> HarnessResult<Self> {
        let spec = InstanceSpec::new().context("Failed to create instance spec")?;
        let mut server = Self::new(spec);
        server.start()?;
        Ok(server)
    }

    /// 启动服务器，阻塞直到就绪
    ///
    /// 配置在调用线程上校验，无效配置不会启动工作线程
    pub fn start(&mut self) -> Result<()> {
        if self.start_thread.is_some() {
            return Err(ServerError::system("server already started"));
        }

        let config = self.spec.to_config();
        config.validate()?;

        let controller = Arc::new(Controller::with_config(
            StandaloneServer::new(),
            self.controller_config.clone(),
        ));
        let starter = controller.clone();
        let handle = thread::Builder::new()
            .name("embedded-server".to_string())
            .spawn(move || starter.run_from_config(&config))
            .map_err(ServerError::startup)?;

        self.controller = Some(controller.clone());
        self.start_thread = Some(handle);

        if let Err(e) = controller.block_until_started() {
            self.join_start_thread();
            return Err(e);
        }

        info!(connect_string = %self.spec.connect_string(), "Testing server started");
        Ok(())
    }

    /// 正常停止并等待启动线程退出
    pub fn stop(&mut self) -> HarnessResult<()> {
        if let Some(controller) = &self.controller {
            controller.close().context("Failed to close embedded server")?;
        }
        self.join_start_thread();
        Ok(())
    }

    /// 强制停止并等待启动线程退出
    pub fn kill(&mut self) {
        if let Some(controller) = &self.controller {
            controller.kill();
        }
        self.join_start_thread();
    }

    /// 在同一端口和数据目录上重新启动
    pub fn restart(&mut self) -> HarnessResult<()> {
        self.stop()?;
        self.start().context("Failed to restart embedded server")?;
        Ok(())
    }

    /// 停止并删除临时数据目录，可重复调用
    pub fn close(&mut self) -> HarnessResult<()> {
        self.stop()?;
        self.spec
            .delete_data_directory()
            .context("Failed to delete data directory")?;
        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.spec.port()
    }

    pub fn connect_string(&self) -> String {
        self.spec.connect_string()
    }

    pub fn spec(&self) -> &InstanceSpec {
        &self.spec
    }

    /// 当前控制器（启动后可用）
    pub fn controller(&self) -> Option<&Arc<Controller>> {
        self.controller.as_ref()
    }

    /// 服务器是否正在服务
    pub fn is_running(&self) -> bool {
        self.controller
            .as_ref()
            .and_then(|controller| controller.server().acceptor())
            .and_then(|acceptor| acceptor.server())
            .is_some_and(|server| server.is_running())
    }

    fn join_start_thread(&mut self) {
        let Some(handle) = self.start_thread.take() else {
            return;
        };
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => info!(error = %e, "Start thread exited with startup failure"),
            Err(_) => warn!("Start thread panicked"),
        }
    }
}

impl Drop for TestingServer {
    fn drop(&mut self) {
        if self.start_thread.is_some() {
            self.kill();
        }
    }
}
