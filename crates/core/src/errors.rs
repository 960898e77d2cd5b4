use thiserror::Error;

use crate::models::TaskStatus;

/// 任务中心错误类型定义
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("当前有任务正在执行")]
    Busy,

    #[error("任务未找到: {id}")]
    TaskNotFound { id: i64 },

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("启动命令失败: {0}")]
    Spawn(String),

    #[error("日志不可用: {path} - {reason}")]
    LogUnavailable { path: String, reason: String },

    #[error("任务 {id} 不允许从 {from} 转换到 {to}")]
    InvalidTransition {
        id: i64,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("任务 {id} 未在运行")]
    TaskNotRunning { id: i64 },

    #[error("无效的任务参数: {0}")]
    InvalidTaskParams(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 统一的Result类型
pub type PanelResult<T> = std::result::Result<T, PanelError>;
