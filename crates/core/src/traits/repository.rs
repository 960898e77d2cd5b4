//! 任务存储接口定义
//!
//! 任务中心唯一的共享可变资源。所有涉及"是否有任务在执行"的判断都必须
//! 通过这里的原子操作完成，生产者不得自行拼装查询后再写入。
//!
//! ## 原子门控
//!
//! - [`TaskRepository::create_exclusive`] - 仅当没有活跃任务时插入
//! - [`TaskRepository::claim_next_waiting`] - 仅当没有运行中任务时，将最早的等待任务置为运行中
//! - [`TaskRepository::update_status`] - 仅当当前状态是目标状态的前置状态时更新
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use panel_core::models::{NewTask, TaskStatus};
//! use panel_core::traits::TaskRepository;
//!
//! async fn run_one(repo: &dyn TaskRepository) -> PanelResult<()> {
//!     let task = repo.create(&NewTask::new("安装插件 mysql80", "true", "/tmp/mysql80.log")).await?;
//!     if let Some(claimed) = repo.claim_next_waiting().await? {
//!         assert_eq!(claimed.id, task.id);
//!         repo.update_status(claimed.id, TaskStatus::Done).await?;
//!     }
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;

use crate::models::{NewTask, Task, TaskId, TaskStatus};
use crate::PanelResult;

/// 任务仓储接口
///
/// 实现必须保证门控操作相对于其他门控操作是原子的。
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// 创建任务，状态为 `waiting`
    async fn create(&self, task: &NewTask) -> PanelResult<Task>;

    /// 仅当不存在 `waiting`/`running` 任务时创建，否则返回 `None`
    async fn create_exclusive(&self, task: &NewTask) -> PanelResult<Option<Task>>;

    async fn get_by_id(&self, id: TaskId) -> PanelResult<Option<Task>>;

    /// 返回当前处于 `waiting` 或 `running` 的任务（id 最小者）
    async fn find_active(&self) -> PanelResult<Option<Task>>;

    async fn get_by_status(&self, status: TaskStatus) -> PanelResult<Vec<Task>>;

    /// 认领下一个任务
    ///
    /// 若已有 `running` 任务则返回 `None`；否则把 id 最小的 `waiting` 任务
    /// 置为 `running` 并返回。检查与认领在同一个原子操作内完成。
    async fn claim_next_waiting(&self) -> PanelResult<Option<Task>>;

    /// 更新任务状态
    ///
    /// # 错误
    ///
    /// * `TaskNotFound` - 任务不存在
    /// * `InvalidTransition` - 当前状态不允许转换到目标状态
    async fn update_status(&self, id: TaskId, status: TaskStatus) -> PanelResult<()>;

    /// 分页查询，按 id 倒序；`page` 与 `page_size` 从 1 开始
    async fn list_paged(&self, page: i64, page_size: i64) -> PanelResult<(Vec<Task>, i64)>;

    /// 删除任务记录，不影响日志文件
    ///
    /// 任务不存在时返回 `TaskNotFound`，重复删除得到同样的错误。
    async fn delete(&self, id: TaskId) -> PanelResult<()>;
}

/// 校验分页参数并换算偏移量
pub fn page_offset(page: i64, page_size: i64) -> PanelResult<i64> {
    if page < 1 || page_size < 1 {
        return Err(crate::PanelError::InvalidTaskParams(format!(
            "分页参数无效: page={page}, page_size={page_size}"
        )));
    }
    Ok((page - 1).saturating_mul(page_size))
}
