use axum::{extract::State, response::IntoResponse};
use panel_core::NewTask;
use tracing::info;

use crate::{error::ApiResult, response::ApiResponse, routes::AppState};

pub const PANEL_UPDATE_TASK_NAME: &str = "更新面板";
pub const PANEL_RESTART_TASK_NAME: &str = "重启面板";

/// 提交面板自更新任务，存在活跃任务时返回 409
pub async fn update_panel(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let task = NewTask::new(
        PANEL_UPDATE_TASK_NAME,
        &state.panel.update_shell,
        &state.panel.update_log,
    );
    let id = state.controller.submit_exclusive(task).await?;
    info!("面板更新任务已提交: {}", id);
    Ok(ApiResponse::success_with_message(id, "面板更新任务已提交"))
}

/// 提交面板重启任务
///
/// 与更新一样走单飞门控，重启不会打断正在执行的任务。
pub async fn restart_panel(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let task = NewTask::new(
        PANEL_RESTART_TASK_NAME,
        &state.panel.restart_shell,
        &state.panel.restart_log,
    );
    let id = state.controller.submit_exclusive(task).await?;
    info!("面板重启任务已提交: {}", id);
    Ok(ApiResponse::success_with_message(id, "面板重启任务已提交"))
}
