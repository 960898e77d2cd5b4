use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use panel_api::{create_app, AppState, PluginTaskFactory};
use panel_core::config::AppConfig;
use panel_core::{TaskExecutor, TaskRepository};
use panel_dispatcher::{RecoveryService, TaskController, TaskDispatcher};
use panel_infrastructure::{DatabaseManager, SqliteTaskRepository};
use panel_worker::ShellExecutor;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::shutdown::ShutdownManager;

/// 主应用程序
///
/// 负责把数据库、执行器、调度器和 HTTP 服务组装在一起。
pub struct Application {
    config: AppConfig,
    database: DatabaseManager,
    dispatcher: Arc<TaskDispatcher>,
    controller: Arc<TaskController>,
    metrics: Option<PrometheusHandle>,
}

impl Application {
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("初始化任务中心");

        let database = DatabaseManager::new(&config.database)
            .await
            .context("初始化数据库失败")?;
        database.migrate().await?;

        let task_repo: Arc<dyn TaskRepository> =
            Arc::new(SqliteTaskRepository::new(database.pool().clone()));
        let executor: Arc<dyn TaskExecutor> =
            Arc::new(ShellExecutor::new(config.task.shell.clone()));

        if config.task.recover_on_startup {
            RecoveryService::new(task_repo.clone())
                .recover_interrupted_tasks()
                .await
                .context("恢复中断任务失败")?;
        }

        let dispatcher = Arc::new(TaskDispatcher::new(
            task_repo.clone(),
            executor.clone(),
            Duration::from_secs(config.task.poll_interval_seconds),
        ));
        let controller = Arc::new(TaskController::new(
            task_repo,
            executor,
            dispatcher.handle(),
            config.task.log_tail_lines,
        ));

        let metrics = if config.observability.metrics_enabled {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .context("安装Prometheus指标记录器失败")?;
            info!("指标导出已启用: {}", config.observability.metrics_endpoint);
            Some(handle)
        } else {
            None
        };

        Ok(Self {
            config,
            database,
            dispatcher,
            controller,
            metrics,
        })
    }

    pub fn controller(&self) -> Arc<TaskController> {
        Arc::clone(&self.controller)
    }

    pub fn dispatcher(&self) -> Arc<TaskDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// 构建带中间件的 HTTP 路由
    pub fn router(&self) -> Router {
        let state = AppState {
            controller: self.controller(),
            plugins: Arc::new(PluginTaskFactory::from_config(&self.config.plugin)),
            panel: Arc::new(self.config.panel.clone()),
            metrics: self.metrics.clone(),
        };
        create_app(state, &self.config.api, &self.config.observability)
    }

    /// 运行调度循环和 API 服务器，直到收到关闭信号
    pub async fn run(&self, shutdown: ShutdownManager) -> Result<()> {
        let dispatcher_handle = tokio::spawn(
            Arc::clone(&self.dispatcher).run(shutdown.subscribe().await),
        );

        let upkeep_rx = shutdown.subscribe().await;
        let upkeep_handle = self.metrics.clone().map(|handle| {
            let mut shutdown_rx = upkeep_rx;
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(5));
                loop {
                    tokio::select! {
                        _ = interval.tick() => handle.run_upkeep(),
                        _ = shutdown_rx.recv() => break,
                    }
                }
            })
        });

        let listener = match TcpListener::bind(&self.config.api.bind_address).await {
            Ok(listener) => listener,
            Err(e) => {
                shutdown.shutdown().await;
                let _ = dispatcher_handle.await;
                return Err(e)
                    .with_context(|| format!("绑定地址失败: {}", self.config.api.bind_address));
            }
        };
        info!("API服务器启动在 http://{}", self.config.api.bind_address);

        let server_shutdown = shutdown.clone();
        let served = axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                server_shutdown.wait_for_shutdown().await;
                info!("API服务器收到关闭信号");
            })
            .await
            .context("API服务器运行失败");

        if !shutdown.is_shutdown().await {
            warn!("API服务器在未收到关闭信号时退出，停止调度循环");
            shutdown.shutdown().await;
        }

        if let Err(e) = dispatcher_handle.await {
            error!("调度循环异常退出: {}", e);
        }
        if let Some(handle) = upkeep_handle {
            let _ = handle.await;
        }

        self.database.close().await;
        info!("任务中心已停止");
        served
    }
}
