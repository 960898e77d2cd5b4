//! 任务执行器接口定义

use async_trait::async_trait;

use crate::models::{ExecutionOutcome, Task, TaskId};
use crate::PanelResult;

/// 任务执行器
///
/// 执行器运行任务的命令，把输出追加到任务日志，并在进程退出后返回结果。
/// 非零退出码不是错误，而是 `success == false` 的结果；只有进程无法启动
/// 时才返回 `PanelError::Spawn`，且错误信息已写入任务日志。
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: &Task) -> PanelResult<ExecutionOutcome>;

    /// 尽力终止正在运行的任务
    async fn cancel(&self, task_id: TaskId) -> PanelResult<()>;

    async fn is_running(&self, task_id: TaskId) -> bool;

    fn name(&self) -> &str;
}
