use std::sync::Arc;

use tracing::{debug, info, warn};

use panel_core::{
    NewTask, PanelError, PanelResult, Task, TaskCenterStatus, TaskExecutor, TaskId, TaskPage,
    TaskRepository, TaskStatus,
};
use panel_worker::task_log;

use crate::dispatcher::DispatchHandle;
use crate::task_metrics::{self, SubmitMode};

/// 任务生命周期控制器
///
/// 生产者（插件安装、面板更新等）通过这里提交任务，界面通过这里查询状态、
/// 查看日志和管理历史记录。
pub struct TaskController {
    task_repo: Arc<dyn TaskRepository>,
    executor: Arc<dyn TaskExecutor>,
    dispatcher: DispatchHandle,
    log_tail_lines: usize,
}

impl TaskController {
    pub fn new(
        task_repo: Arc<dyn TaskRepository>,
        executor: Arc<dyn TaskExecutor>,
        dispatcher: DispatchHandle,
        log_tail_lines: usize,
    ) -> Self {
        Self {
            task_repo,
            executor,
            dispatcher,
            log_tail_lines,
        }
    }

    /// 排队提交，任务总是以 `waiting` 入库，执行顺序交给调度器
    pub async fn submit_queued(&self, task: NewTask) -> PanelResult<TaskId> {
        task.validate().map_err(PanelError::InvalidTaskParams)?;

        let created = self.task_repo.create(&task).await?;
        self.dispatcher.wake();
        task_metrics::record_submitted(SubmitMode::Queued);

        info!("任务已排队: {} (id={})", created.name, created.id);
        Ok(created.id)
    }

    /// 独占提交，存在活跃任务时返回 `Busy`
    pub async fn submit_exclusive(&self, task: NewTask) -> PanelResult<TaskId> {
        task.validate().map_err(PanelError::InvalidTaskParams)?;

        let Some(created) = self.task_repo.create_exclusive(&task).await? else {
            task_metrics::record_rejected_busy();
            warn!("当前有任务正在执行，拒绝提交: {}", task.name);
            return Err(PanelError::Busy);
        };
        self.dispatcher.wake();
        task_metrics::record_submitted(SubmitMode::Exclusive);

        info!("独占任务已提交: {} (id={})", created.name, created.id);
        Ok(created.id)
    }

    pub async fn status(&self) -> PanelResult<TaskCenterStatus> {
        let active = self.task_repo.find_active().await?;
        Ok(TaskCenterStatus {
            active: active.is_some(),
        })
    }

    pub async fn get(&self, id: TaskId) -> PanelResult<Task> {
        self.task_repo
            .get_by_id(id)
            .await?
            .ok_or(PanelError::TaskNotFound { id })
    }

    /// 任务日志的最后若干行，最新的一行在最前
    pub async fn tail_log(&self, id: TaskId) -> PanelResult<String> {
        let task = self.get(id).await?;
        task_log::tail_reversed(&task.log, self.log_tail_lines).await
    }

    pub async fn list(&self, page: i64, page_size: i64) -> PanelResult<TaskPage> {
        let (items, total) = self.task_repo.list_paged(page, page_size).await?;
        Ok(TaskPage { total, items })
    }

    /// 删除任务记录
    ///
    /// 只删除记录，不终止进程，也不删除日志文件。运行中的任务会继续执行到结束。
    pub async fn delete(&self, id: TaskId) -> PanelResult<()> {
        if self.executor.is_running(id).await {
            warn!("删除运行中的任务记录 {}，进程将继续执行", id);
        }
        self.task_repo.delete(id).await?;
        debug!("任务记录已删除: {}", id);
        Ok(())
    }

    /// 尽力取消运行中的任务，任务随后按失败结束
    pub async fn cancel(&self, id: TaskId) -> PanelResult<()> {
        let task = self.get(id).await?;
        if task.status != TaskStatus::Running {
            return Err(PanelError::TaskNotRunning { id });
        }
        self.executor.cancel(id).await?;
        info!("已请求取消任务: {} (id={})", task.name, id);
        Ok(())
    }
}
