pub mod task;

pub use task::{ExecutionOutcome, NewTask, Task, TaskCenterStatus, TaskId, TaskPage, TaskStatus};
