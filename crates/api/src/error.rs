use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use panel_core::PanelError;
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("任务中心错误: {0}")]
    Panel(#[from] PanelError),

    #[error("请求参数错误: {0}")]
    BadRequest(String),

    #[error("未找到资源")]
    NotFound,
}

impl ApiError {
    fn parts(&self) -> (StatusCode, String, &'static str, Vec<String>) {
        match self {
            ApiError::Panel(PanelError::Busy) => (
                StatusCode::CONFLICT,
                "当前有任务正在执行，请稍后再试".to_string(),
                "TASK_CENTER_BUSY",
                vec![
                    "等待当前任务结束后重试".to_string(),
                    "使用 GET /api/task/status 查看任务中心状态".to_string(),
                ],
            ),
            ApiError::Panel(PanelError::TaskNotFound { id }) => (
                StatusCode::NOT_FOUND,
                format!("任务 ID {} 不存在", id),
                "TASK_NOT_FOUND",
                vec![
                    "请检查任务ID是否正确".to_string(),
                    "使用 GET /api/task/list 查看所有任务".to_string(),
                ],
            ),
            ApiError::Panel(PanelError::LogUnavailable { .. }) => (
                StatusCode::GONE,
                "日志已被清理".to_string(),
                "LOG_UNAVAILABLE",
                vec!["日志文件已被删除或轮转".to_string()],
            ),
            ApiError::Panel(PanelError::InvalidTransition { id, from, to }) => (
                StatusCode::CONFLICT,
                format!("任务 {} 不允许从 {} 转换到 {}", id, from, to),
                "INVALID_TRANSITION",
                vec!["请刷新任务状态后重试".to_string()],
            ),
            ApiError::Panel(PanelError::TaskNotRunning { id }) => (
                StatusCode::CONFLICT,
                format!("任务 {} 未在运行", id),
                "TASK_NOT_RUNNING",
                vec!["只能取消运行中的任务".to_string()],
            ),
            ApiError::Panel(PanelError::InvalidTaskParams(msg)) => (
                StatusCode::BAD_REQUEST,
                format!("任务参数无效: {}", msg),
                "INVALID_TASK_PARAMS",
                vec!["请检查请求参数".to_string()],
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                format!("请求参数错误: {}", msg),
                "BAD_REQUEST",
                vec![
                    "请检查请求格式和参数".to_string(),
                    "确保Content-Type正确设置".to_string(),
                ],
            ),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                "请求的资源不存在".to_string(),
                "NOT_FOUND",
                vec!["请检查请求URL是否正确".to_string()],
            ),
            ApiError::Panel(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "系统内部错误".to_string(),
                "INTERNAL_ERROR",
                vec![
                    "系统遇到内部错误，请稍后重试".to_string(),
                    "查看 GET /health 检查系统状态".to_string(),
                ],
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_type, suggestions) = self.parts();

        if status.is_server_error() {
            error!("请求处理失败: {}", self);
        }

        let body = Json(json!({
            "error": {
                "message": error_message,
                "type": error_type,
                "code": status.as_u16(),
                "suggestions": suggestions,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use panel_core::TaskStatus;

    #[test]
    fn test_panel_error_conversion() {
        let api_error: ApiError = PanelError::TaskNotFound { id: 123 }.into();
        match api_error {
            ApiError::Panel(PanelError::TaskNotFound { id }) => assert_eq!(id, 123),
            _ => panic!("Expected PanelError::TaskNotFound"),
        }
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (PanelError::Busy, StatusCode::CONFLICT),
            (PanelError::TaskNotFound { id: 1 }, StatusCode::NOT_FOUND),
            (
                PanelError::LogUnavailable {
                    path: "/tmp/x.log".to_string(),
                    reason: "No such file".to_string(),
                },
                StatusCode::GONE,
            ),
            (
                PanelError::InvalidTransition {
                    id: 1,
                    from: TaskStatus::Done,
                    to: TaskStatus::Running,
                },
                StatusCode::CONFLICT,
            ),
            (PanelError::TaskNotRunning { id: 1 }, StatusCode::CONFLICT),
            (
                PanelError::InvalidTaskParams("slug".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                PanelError::Internal("locked".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                PanelError::Spawn("not found".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_bad_request() {
        let response = ApiError::BadRequest("page".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
