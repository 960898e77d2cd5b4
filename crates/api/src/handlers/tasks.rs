use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;

use crate::{
    error::ApiResult,
    extract::{ApiPath, ApiQuery},
    response::{success, ApiResponse, PaginatedResponse},
    routes::AppState,
};

/// 任务列表查询参数
#[derive(Debug, Deserialize)]
pub struct TaskListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl TaskListParams {
    /// 缺省为第1页、每页10条，小于1的值按1处理
    pub fn normalized(&self) -> (i64, i64) {
        (
            self.page.unwrap_or(1).max(1),
            self.limit.unwrap_or(10).max(1),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct TaskIdParams {
    pub id: i64,
}

/// 任务中心是否有活跃任务
pub async fn get_task_status(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let status = state.controller.status().await?;
    Ok(success(status))
}

/// 分页获取任务列表，最新的任务在最前
pub async fn list_tasks(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<TaskListParams>,
) -> ApiResult<impl IntoResponse> {
    let (page, page_size) = params.normalized();
    let result = state.controller.list(page, page_size).await?;
    Ok(success(PaginatedResponse::new(
        result.items,
        result.total,
        page,
        page_size,
    )))
}

/// 任务日志，最新的一行在最前
pub async fn tail_task_log(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<TaskIdParams>,
) -> ApiResult<impl IntoResponse> {
    let log = state.controller.tail_log(params.id).await?;
    Ok(success(log))
}

pub async fn delete_task(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<TaskIdParams>,
) -> ApiResult<impl IntoResponse> {
    state.controller.delete(params.id).await?;
    Ok(ApiResponse::success_empty_with_message("删除成功"))
}

pub async fn get_task(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    let task = state.controller.get(id).await?;
    Ok(success(task))
}

/// 尽力取消运行中的任务
pub async fn cancel_task(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    state.controller.cancel(id).await?;
    Ok(ApiResponse::success_empty_with_message("已发送终止信号"))
}
