use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use panel_core::{PanelResult, TaskId, TaskRepository, TaskStatus};
use panel_worker::task_log;

/// 恢复报告
#[derive(Debug, Clone, Default)]
pub struct RecoveryReport {
    pub failed_tasks: Vec<TaskId>,
    pub recovery_duration_ms: u64,
    pub errors: Vec<String>,
}

/// 启动恢复服务
///
/// 上一个进程退出时仍处于 `running` 的任务已无法跟踪，统一标记为失败，
/// 否则单飞门控会一直被占用。
pub struct RecoveryService {
    task_repo: Arc<dyn TaskRepository>,
}

impl RecoveryService {
    pub fn new(task_repo: Arc<dyn TaskRepository>) -> Self {
        Self { task_repo }
    }

    pub async fn recover_interrupted_tasks(&self) -> PanelResult<RecoveryReport> {
        let start_time = Instant::now();
        info!("开始恢复中断的任务");

        let running_tasks = self.task_repo.get_by_status(TaskStatus::Running).await?;
        let mut report = RecoveryReport::default();

        for task in running_tasks {
            warn!(
                "任务 {} ({}) 在上次运行时未结束，将标记为失败",
                task.id, task.name
            );

            if let Err(e) = self.task_repo.update_status(task.id, TaskStatus::Failed).await {
                report.errors.push(format!("任务 {}: {}", task.id, e));
                continue;
            }

            if let Err(e) =
                task_log::append_line(&task.log, "面板重启时任务仍在运行，已标记为失败").await
            {
                warn!("写入任务 {} 日志失败: {}", task.id, e);
            }

            report.failed_tasks.push(task.id);
        }

        report.recovery_duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "任务恢复完成: 标记失败 {} 个，错误 {} 个，耗时 {}ms",
            report.failed_tasks.len(),
            report.errors.len(),
            report.recovery_duration_ms
        );
        Ok(report)
    }
}
