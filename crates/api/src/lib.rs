//! # Panel API
//!
//! 任务中心的 HTTP 接口，基于 Axum 构建。
//!
//! ## API 端点
//!
//! ### 任务中心
//! - `GET /api/task/status` - 是否有任务正在执行
//! - `GET /api/task/list?page&limit` - 分页任务列表，最新的在最前
//! - `GET /api/task/log?id` - 任务日志，最新的一行在最前
//! - `DELETE /api/task?id` - 删除任务记录
//! - `GET /api/task/{id}` - 任务详情
//! - `POST /api/task/{id}/cancel` - 取消运行中的任务
//!
//! ### 任务生产者
//! - `POST /api/plugin/{install|uninstall|update}` - 插件操作，排队执行
//! - `POST /api/panel/update` - 面板自更新，有活跃任务时拒绝
//! - `POST /api/panel/restart` - 重启面板，有活跃任务时拒绝
//!
//! ## 响应格式
//!
//! 成功时返回 `{"success": true, "data": ..., "message": ..., "timestamp": ...}`，
//! 失败时返回 `{"error": {"message", "type", "code", "suggestions", "timestamp"}}`。

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod plugins;
pub mod response;
pub mod routes;

use axum::Router;
use panel_core::config::{ApiConfig, ObservabilityConfig};
use tower::ServiceBuilder;

use middleware::{cors_layer, request_logging, trace_layer};
pub use plugins::{PluginAction, PluginTaskFactory};
pub use routes::{create_routes, AppState};

/// 创建完整的API应用
pub fn create_app(
    state: AppState,
    api_config: &ApiConfig,
    observability: &ObservabilityConfig,
) -> Router {
    let router = create_routes(state, &observability.metrics_endpoint).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(axum::middleware::from_fn(request_logging)),
    );

    if api_config.cors_enabled {
        router.layer(cors_layer(&api_config.cors_origins))
    } else {
        router
    }
}
