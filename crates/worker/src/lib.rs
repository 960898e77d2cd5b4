pub mod executors;
pub mod task_log;

pub use executors::ShellExecutor;
pub use task_log::{append_line, tail_reversed};
