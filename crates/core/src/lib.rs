pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod traits;

pub use errors::*;
pub use logging::init_logging;
pub use models::{ExecutionOutcome, NewTask, Task, TaskCenterStatus, TaskId, TaskPage, TaskStatus};
pub use traits::{TaskExecutor, TaskRepository};
