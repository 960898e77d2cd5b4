#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use panel_core::{
    ExecutionOutcome, NewTask, PanelError, PanelResult, Task, TaskExecutor, TaskId,
    TaskRepository, TaskStatus,
};
use panel_infrastructure::InMemoryTaskRepository;
use tokio::sync::Mutex;

/// 测试用执行器
///
/// shell 为 `false` 时返回失败结果，为 `spawn-error` 时模拟启动失败。
#[derive(Debug, Default)]
pub struct MockExecutor {
    pub execution_delay_ms: u64,
    pub executed: Arc<Mutex<Vec<TaskId>>>,
    running: Arc<Mutex<HashSet<TaskId>>>,
    current: AtomicUsize,
    pub max_concurrent: AtomicUsize,
}

impl MockExecutor {
    pub fn with_delay(execution_delay_ms: u64) -> Self {
        Self {
            execution_delay_ms,
            ..Self::default()
        }
    }

    pub async fn executed(&self) -> Vec<TaskId> {
        self.executed.lock().await.clone()
    }
}

#[async_trait]
impl TaskExecutor for MockExecutor {
    async fn execute(&self, task: &Task) -> PanelResult<ExecutionOutcome> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now, Ordering::SeqCst);
        self.running.lock().await.insert(task.id);

        tokio::time::sleep(Duration::from_millis(self.execution_delay_ms)).await;

        self.running.lock().await.remove(&task.id);
        self.executed.lock().await.push(task.id);
        self.current.fetch_sub(1, Ordering::SeqCst);

        match task.shell.as_str() {
            "spawn-error" => Err(PanelError::Spawn("模拟启动失败".to_string())),
            "false" => Ok(ExecutionOutcome {
                success: false,
                exit_code: Some(1),
                execution_time_ms: self.execution_delay_ms,
            }),
            _ => Ok(ExecutionOutcome {
                success: true,
                exit_code: Some(0),
                execution_time_ms: self.execution_delay_ms,
            }),
        }
    }

    async fn cancel(&self, task_id: TaskId) -> PanelResult<()> {
        if self.running.lock().await.contains(&task_id) {
            Ok(())
        } else {
            Err(PanelError::TaskNotRunning { id: task_id })
        }
    }

    async fn is_running(&self, task_id: TaskId) -> bool {
        self.running.lock().await.contains(&task_id)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// 终态写入会先失败若干次的仓储
///
/// 模拟 SQLite 在繁忙超时后返回 "database is locked"。
pub struct FlakyRepository {
    inner: InMemoryTaskRepository,
    terminal_failures: AtomicUsize,
}

impl FlakyRepository {
    pub fn new(terminal_failures: usize) -> Self {
        Self {
            inner: InMemoryTaskRepository::new(),
            terminal_failures: AtomicUsize::new(terminal_failures),
        }
    }

    pub fn remaining_failures(&self) -> usize {
        self.terminal_failures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskRepository for FlakyRepository {
    async fn create(&self, task: &NewTask) -> PanelResult<Task> {
        self.inner.create(task).await
    }

    async fn create_exclusive(&self, task: &NewTask) -> PanelResult<Option<Task>> {
        self.inner.create_exclusive(task).await
    }

    async fn get_by_id(&self, id: TaskId) -> PanelResult<Option<Task>> {
        self.inner.get_by_id(id).await
    }

    async fn find_active(&self) -> PanelResult<Option<Task>> {
        self.inner.find_active().await
    }

    async fn get_by_status(&self, status: TaskStatus) -> PanelResult<Vec<Task>> {
        self.inner.get_by_status(status).await
    }

    async fn claim_next_waiting(&self) -> PanelResult<Option<Task>> {
        self.inner.claim_next_waiting().await
    }

    async fn update_status(&self, id: TaskId, status: TaskStatus) -> PanelResult<()> {
        let should_fail = status.is_terminal()
            && self
                .terminal_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
        if should_fail {
            return Err(PanelError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.update_status(id, status).await
    }

    async fn list_paged(&self, page: i64, page_size: i64) -> PanelResult<(Vec<Task>, i64)> {
        self.inner.list_paged(page, page_size).await
    }

    async fn delete(&self, id: TaskId) -> PanelResult<()> {
        self.inner.delete(id).await
    }
}
