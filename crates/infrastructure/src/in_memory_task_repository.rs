use async_trait::async_trait;
use chrono::Utc;
use panel_core::{
    models::{NewTask, Task, TaskId, TaskStatus},
    traits::{page_offset, TaskRepository},
    PanelError, PanelResult,
};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

/// 内存任务仓储
///
/// 所有门控操作在同一把写锁内完成检查与修改，语义与 SQLite 实现一致。
/// 进程重启后数据丢失，适用于测试和无需持久化的嵌入场景。
#[derive(Debug, Default)]
pub struct InMemoryTaskRepository {
    state: RwLock<InMemoryState>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    /// 最近一次分配的ID，删除后不复用
    last_id: TaskId,
    tasks: BTreeMap<TaskId, Task>,
}

impl InMemoryState {
    fn insert(&mut self, task: &NewTask) -> Task {
        self.last_id += 1;
        let now = Utc::now();
        let created = Task {
            id: self.last_id,
            name: task.name.clone(),
            shell: task.shell.clone(),
            log: task.log.clone(),
            status: TaskStatus::Waiting,
            created_at: now,
            updated_at: now,
        };
        self.tasks.insert(created.id, created.clone());
        created
    }

    fn has_status(&self, status: TaskStatus) -> bool {
        self.tasks.values().any(|t| t.status == status)
    }
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn create(&self, task: &NewTask) -> PanelResult<Task> {
        let mut state = self.state.write().await;
        let created = state.insert(task);
        debug!("任务已创建: {} (id={})", created.name, created.id);
        Ok(created)
    }

    async fn create_exclusive(&self, task: &NewTask) -> PanelResult<Option<Task>> {
        let mut state = self.state.write().await;
        if state.tasks.values().any(Task::is_active) {
            return Ok(None);
        }
        Ok(Some(state.insert(task)))
    }

    async fn get_by_id(&self, id: TaskId) -> PanelResult<Option<Task>> {
        let state = self.state.read().await;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn find_active(&self) -> PanelResult<Option<Task>> {
        let state = self.state.read().await;
        Ok(state.tasks.values().find(|t| t.is_active()).cloned())
    }

    async fn get_by_status(&self, status: TaskStatus) -> PanelResult<Vec<Task>> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect())
    }

    async fn claim_next_waiting(&self) -> PanelResult<Option<Task>> {
        let mut state = self.state.write().await;
        if state.has_status(TaskStatus::Running) {
            return Ok(None);
        }

        let next = state
            .tasks
            .values_mut()
            .find(|t| t.status == TaskStatus::Waiting);

        Ok(next.map(|task| {
            task.status = TaskStatus::Running;
            task.updated_at = Utc::now();
            debug!("已认领任务: {} (id={})", task.name, task.id);
            task.clone()
        }))
    }

    async fn update_status(&self, id: TaskId, status: TaskStatus) -> PanelResult<()> {
        let mut state = self.state.write().await;
        let task = state
            .tasks
            .get_mut(&id)
            .ok_or(PanelError::TaskNotFound { id })?;

        if !task.status.can_transition_to(status) {
            return Err(PanelError::InvalidTransition {
                id,
                from: task.status,
                to: status,
            });
        }

        task.status = status;
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn list_paged(&self, page: i64, page_size: i64) -> PanelResult<(Vec<Task>, i64)> {
        let offset = page_offset(page, page_size)?;
        let state = self.state.read().await;
        let items = state
            .tasks
            .values()
            .rev()
            .skip(offset as usize)
            .take(page_size as usize)
            .cloned()
            .collect();
        Ok((items, state.tasks.len() as i64))
    }

    async fn delete(&self, id: TaskId) -> PanelResult<()> {
        let mut state = self.state.write().await;
        state
            .tasks
            .remove(&id)
            .map(|_| ())
            .ok_or(PanelError::TaskNotFound { id })
    }
}
