use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;

use crate::{
    error::ApiResult,
    extract::{ApiJson, ApiPath},
    plugins::PluginAction,
    response::ApiResponse,
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct PluginRequest {
    pub slug: String,
}

/// 提交插件安装/卸载/更新任务，任务排队执行
pub async fn run_plugin_action(
    State(state): State<AppState>,
    ApiPath(action): ApiPath<String>,
    ApiJson(request): ApiJson<PluginRequest>,
) -> ApiResult<impl IntoResponse> {
    let action: PluginAction = action.parse()?;
    let task = state.plugins.build(action, &request.slug).await?;
    let id = state.controller.submit_queued(task).await?;
    Ok(ApiResponse::success_with_message(id, "任务已提交"))
}
