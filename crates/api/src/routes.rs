use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use panel_core::config::PanelConfig;
use panel_dispatcher::TaskController;
use std::sync::Arc;

use crate::handlers::{
    health::health_check,
    metrics::render_metrics,
    panel::{restart_panel, update_panel},
    plugins::run_plugin_action,
    tasks::{cancel_task, delete_task, get_task, get_task_status, list_tasks, tail_task_log},
};
use crate::plugins::PluginTaskFactory;

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<TaskController>,
    pub plugins: Arc<PluginTaskFactory>,
    pub panel: Arc<PanelConfig>,
    pub metrics: Option<PrometheusHandle>,
}

/// 创建API路由
pub fn create_routes(state: AppState, metrics_endpoint: &str) -> Router {
    let mut router = Router::new()
        // 健康检查
        .route("/health", get(health_check))
        // 任务中心
        .route("/api/task/status", get(get_task_status))
        .route("/api/task/list", get(list_tasks))
        .route("/api/task/log", get(tail_task_log))
        .route("/api/task", axum::routing::delete(delete_task))
        .route("/api/task/{id}", get(get_task))
        .route("/api/task/{id}/cancel", post(cancel_task))
        // 任务生产者
        .route("/api/plugin/{action}", post(run_plugin_action))
        .route("/api/panel/update", post(update_panel))
        .route("/api/panel/restart", post(restart_panel));

    if state.metrics.is_some() {
        router = router.route(metrics_endpoint, get(render_metrics));
    }

    router.with_state(state)
}
