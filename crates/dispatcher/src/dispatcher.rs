use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, Mutex, Notify};
use tracing::{debug, error, info, warn};

use panel_core::{PanelError, PanelResult, TaskExecutor, TaskId, TaskRepository, TaskStatus};

use crate::task_metrics;

const TERMINAL_WRITE_ATTEMPTS: u32 = 3;
const TERMINAL_WRITE_BACKOFF: Duration = Duration::from_millis(50);

/// 一次调度的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub execution_time_ms: u64,
}

/// 唤醒调度器的句柄
///
/// 新任务入库后调用 [`DispatchHandle::wake`]，调度器无需等到下一个轮询周期。
#[derive(Debug, Clone, Default)]
pub struct DispatchHandle {
    wakeup: Arc<Notify>,
}

impl DispatchHandle {
    pub fn wake(&self) {
        self.wakeup.notify_one();
    }
}

/// 单飞调度器
///
/// 同一时刻最多只有一个任务处于 `running`。认领动作由存储层的原子操作
/// 完成，因此即使存在多个调度器实例也不会同时运行两个任务。
pub struct TaskDispatcher {
    task_repo: Arc<dyn TaskRepository>,
    executor: Arc<dyn TaskExecutor>,
    handle: DispatchHandle,
    poll_interval: Duration,
    /// 已执行完但终态未能写入的任务，下次调度前补写
    pending_terminal: Mutex<Option<(TaskId, TaskStatus)>>,
}

impl TaskDispatcher {
    pub fn new(
        task_repo: Arc<dyn TaskRepository>,
        executor: Arc<dyn TaskExecutor>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            task_repo,
            executor,
            handle: DispatchHandle::default(),
            poll_interval,
            pending_terminal: Mutex::new(None),
        }
    }

    pub fn handle(&self) -> DispatchHandle {
        self.handle.clone()
    }

    /// 认领并执行下一个等待中的任务
    ///
    /// 已有任务在运行或没有等待任务时返回 `None`。
    pub async fn dispatch_next(&self) -> PanelResult<Option<DispatchOutcome>> {
        self.flush_pending_terminal().await?;

        let Some(task) = self.task_repo.claim_next_waiting().await? else {
            return Ok(None);
        };

        info!(
            "开始执行任务: task_id={}, name={}, executor={}",
            task.id,
            task.name,
            self.executor.name()
        );
        let started = Instant::now();

        let status = match self.executor.execute(&task).await {
            Ok(outcome) => outcome.final_status(),
            Err(e) => {
                warn!("任务 {} 无法执行: {}", task.id, e);
                TaskStatus::Failed
            }
        };
        let elapsed = started.elapsed();

        if let Err(e) = self.write_terminal(task.id, status).await {
            error!(
                "更新任务 {} 最终状态失败，将在下次调度前重试: {}",
                task.id, e
            );
            *self.pending_terminal.lock().await = Some((task.id, status));
            return Err(e);
        }

        task_metrics::record_finished(status, elapsed);
        info!(
            "任务执行结束: task_id={}, name={}, status={}, duration={}ms",
            task.id,
            task.name,
            status,
            elapsed.as_millis()
        );

        Ok(Some(DispatchOutcome {
            task_id: task.id,
            status,
            execution_time_ms: elapsed.as_millis() as u64,
        }))
    }

    /// 写入终态，存储层出错时按退避重试
    ///
    /// 任务已被删除视为成功，运行中的记录不会因此卡住门控。
    async fn write_terminal(&self, id: TaskId, status: TaskStatus) -> PanelResult<()> {
        let mut attempt = 1;
        loop {
            match self.task_repo.update_status(id, status).await {
                Ok(()) => return Ok(()),
                Err(PanelError::TaskNotFound { .. }) => {
                    warn!("任务 {} 在执行期间被删除，跳过状态更新", id);
                    return Ok(());
                }
                Err(e @ PanelError::InvalidTransition { .. }) => return Err(e),
                Err(e) if attempt >= TERMINAL_WRITE_ATTEMPTS => return Err(e),
                Err(e) => {
                    warn!(
                        "写入任务 {} 终态失败（第 {} 次）: {}",
                        id, attempt, e
                    );
                    tokio::time::sleep(TERMINAL_WRITE_BACKOFF * attempt).await;
                    attempt += 1;
                }
            }
        }
    }

    /// 补写上一轮未能写入的终态，成功前不认领新任务
    async fn flush_pending_terminal(&self) -> PanelResult<()> {
        let mut pending = self.pending_terminal.lock().await;
        let Some((id, status)) = *pending else {
            return Ok(());
        };

        match self.write_terminal(id, status).await {
            Ok(()) => {
                info!("已补写任务 {} 的最终状态: {}", id, status);
                *pending = None;
                Ok(())
            }
            Err(e @ PanelError::InvalidTransition { .. }) => {
                // 记录已不在 running，无需再补写
                warn!("任务 {} 的终态无需补写: {}", id, e);
                *pending = None;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// 依次执行所有等待中的任务，返回本轮执行的数量
    pub async fn drain(&self) -> PanelResult<usize> {
        let mut executed = 0;
        while self.dispatch_next().await?.is_some() {
            executed += 1;
        }
        if executed > 0 {
            debug!("本轮调度执行了 {} 个任务", executed);
        }
        Ok(executed)
    }

    /// 调度循环，直到收到关闭信号
    ///
    /// 关闭时正在运行的子进程不会被终止，其任务保持 `running`，
    /// 由下次启动时的恢复流程处理。
    pub async fn run(self: Arc<Self>, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("任务调度器已启动，轮询间隔: {:?}", self.poll_interval);
        let mut interval = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("调度器收到关闭信号");
                    break;
                }
                _ = self.handle.wakeup.notified() => {}
                _ = interval.tick() => {}
            }

            tokio::select! {
                result = self.drain() => {
                    if let Err(e) = result {
                        error!("任务调度失败: {}", e);
                    }
                }
                _ = shutdown_rx.recv() => {
                    warn!("调度器在任务执行期间收到关闭信号，运行中的任务将在下次启动时被标记为失败");
                    break;
                }
            }
        }

        info!("任务调度器已停止");
    }
}
