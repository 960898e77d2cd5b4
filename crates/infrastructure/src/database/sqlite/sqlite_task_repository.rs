use async_trait::async_trait;
use chrono::Utc;
use panel_core::{
    models::{NewTask, Task, TaskId, TaskStatus},
    traits::{page_offset, TaskRepository},
    PanelError, PanelResult,
};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::{debug, error, instrument};

const TASK_COLUMNS: &str = "id, name, shell, log, status, created_at, updated_at";

/// 基于 SQLite 的任务仓储
///
/// 门控操作都是单条 SQL 语句，检查与写入由 SQLite 的写锁保证原子性。
pub struct SqliteTaskRepository {
    pool: SqlitePool,
}

impl SqliteTaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_task(row: &SqliteRow) -> PanelResult<Task> {
        Ok(Task {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            shell: row.try_get("shell")?,
            log: row.try_get("log")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// 条件更新未命中时，区分任务不存在与状态不允许
    async fn transition_error(&self, id: TaskId, to: TaskStatus) -> PanelError {
        match self.get_by_id(id).await {
            Ok(Some(current)) => PanelError::InvalidTransition {
                id,
                from: current.status,
                to,
            },
            Ok(None) => PanelError::TaskNotFound { id },
            Err(e) => e,
        }
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    #[instrument(skip(self, task), fields(task_name = %task.name))]
    async fn create(&self, task: &NewTask) -> PanelResult<Task> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO tasks (name, shell, log, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING {TASK_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&task.name)
            .bind(&task.shell)
            .bind(&task.log)
            .bind(TaskStatus::Waiting)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "创建任务失败");
                PanelError::Database(e)
            })?;

        let created = Self::row_to_task(&row)?;
        debug!("任务已创建: {} (id={})", created.name, created.id);
        Ok(created)
    }

    #[instrument(skip(self, task), fields(task_name = %task.name))]
    async fn create_exclusive(&self, task: &NewTask) -> PanelResult<Option<Task>> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO tasks (name, shell, log, status, created_at, updated_at) \
             SELECT ?, ?, ?, ?, ?, ? \
             WHERE NOT EXISTS (SELECT 1 FROM tasks WHERE status IN ('waiting', 'running')) \
             RETURNING {TASK_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&task.name)
            .bind(&task.shell)
            .bind(&task.log)
            .bind(TaskStatus::Waiting)
            .bind(now)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "独占创建任务失败");
                PanelError::Database(e)
            })?;

        match row {
            Some(row) => {
                let created = Self::row_to_task(&row)?;
                debug!("独占任务已创建: {} (id={})", created.name, created.id);
                Ok(Some(created))
            }
            None => {
                debug!("存在活跃任务，拒绝独占创建");
                Ok(None)
            }
        }
    }

    async fn get_by_id(&self, id: TaskId) -> PanelResult<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(PanelError::Database)?;

        match row {
            Some(row) => Ok(Some(Self::row_to_task(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_active(&self) -> PanelResult<Option<Task>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE status IN ('waiting', 'running') \
             ORDER BY id ASC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(PanelError::Database)?;

        match row {
            Some(row) => Ok(Some(Self::row_to_task(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_by_status(&self, status: TaskStatus) -> PanelResult<Vec<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE status = ? ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await
            .map_err(PanelError::Database)?;

        rows.iter().map(Self::row_to_task).collect()
    }

    #[instrument(skip(self))]
    async fn claim_next_waiting(&self) -> PanelResult<Option<Task>> {
        let sql = format!(
            "UPDATE tasks SET status = 'running', updated_at = ? \
             WHERE id = (SELECT id FROM tasks WHERE status = 'waiting' ORDER BY id ASC LIMIT 1) \
             AND NOT EXISTS (SELECT 1 FROM tasks WHERE status = 'running') \
             RETURNING {TASK_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "认领等待任务失败");
                PanelError::Database(e)
            })?;

        match row {
            Some(row) => {
                let task = Self::row_to_task(&row)?;
                debug!("已认领任务: {} (id={})", task.name, task.id);
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(task_id = id, status = %status))]
    async fn update_status(&self, id: TaskId, status: TaskStatus) -> PanelResult<()> {
        let Some(from) = status.required_predecessor() else {
            return Err(self.transition_error(id, status).await);
        };

        let result =
            sqlx::query("UPDATE tasks SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
                .bind(status)
                .bind(Utc::now())
                .bind(id)
                .bind(from)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    error!(error = %e, "更新任务状态失败");
                    PanelError::Database(e)
                })?;

        if result.rows_affected() == 0 {
            return Err(self.transition_error(id, status).await);
        }

        debug!("任务 {} 状态更新为 {}", id, status);
        Ok(())
    }

    async fn list_paged(&self, page: i64, page_size: i64) -> PanelResult<(Vec<Task>, i64)> {
        let offset = page_offset(page, page_size)?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
            .fetch_one(&self.pool)
            .await
            .map_err(PanelError::Database)?;

        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id DESC LIMIT ? OFFSET ?");
        let rows = sqlx::query(&sql)
            .bind(page_size)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(PanelError::Database)?;

        let items = rows
            .iter()
            .map(Self::row_to_task)
            .collect::<PanelResult<Vec<_>>>()?;
        Ok((items, total))
    }

    #[instrument(skip(self), fields(task_id = id))]
    async fn delete(&self, id: TaskId) -> PanelResult<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(PanelError::Database)?;

        if result.rows_affected() == 0 {
            return Err(PanelError::TaskNotFound { id });
        }

        debug!("任务记录已删除: {}", id);
        Ok(())
    }
}
