use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 任务ID，由存储层单调分配
pub type TaskId = i64;

/// 一个异步执行的管理任务
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub shell: String,
    pub log: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// 是否处于活跃状态（等待或运行中）
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// 生产者提交的任务定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub name: String,
    pub shell: String,
    pub log: String,
}

impl NewTask {
    pub fn new(name: impl Into<String>, shell: impl Into<String>, log: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shell: shell.into(),
            log: log.into(),
        }
    }

    /// 校验必填字段，shell 内容本身不做检查
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("任务名称不能为空".to_string());
        }
        if self.shell.trim().is_empty() {
            return Err("任务命令不能为空".to_string());
        }
        if self.log.trim().is_empty() {
            return Err("任务日志路径不能为空".to_string());
        }
        Ok(())
    }
}

/// 任务状态
///
/// 状态机: `Waiting → Running → {Done, Failed}`，终态不可再转换。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Waiting,
    Running,
    Failed,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Waiting => "waiting",
            TaskStatus::Running => "running",
            TaskStatus::Failed => "failed",
            TaskStatus::Done => "done",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Waiting | TaskStatus::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }

    /// 转换到当前状态所必须的前置状态，`Waiting` 只能在创建时产生
    pub fn required_predecessor(&self) -> Option<TaskStatus> {
        match self {
            TaskStatus::Waiting => None,
            TaskStatus::Running => Some(TaskStatus::Waiting),
            TaskStatus::Done | TaskStatus::Failed => Some(TaskStatus::Running),
        }
    }

    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        next.required_predecessor() == Some(*self)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(TaskStatus::Waiting),
            "running" => Ok(TaskStatus::Running),
            "failed" => Ok(TaskStatus::Failed),
            "done" => Ok(TaskStatus::Done),
            _ => Err(format!("Invalid task status: {s}")),
        }
    }
}

impl sqlx::Type<sqlx::Sqlite> for TaskStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <str as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for TaskStatus {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(s.parse::<TaskStatus>()?)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for TaskStatus {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
    }
}

/// 分页查询结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPage {
    pub total: i64,
    pub items: Vec<Task>,
}

/// 任务中心当前状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCenterStatus {
    pub active: bool,
}

/// 一次命令执行的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub execution_time_ms: u64,
}

impl ExecutionOutcome {
    /// 执行结果对应的终态
    pub fn final_status(&self) -> TaskStatus {
        if self.success {
            TaskStatus::Done
        } else {
            TaskStatus::Failed
        }
    }
}
