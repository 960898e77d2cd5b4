pub mod controller;
pub mod dispatcher;
pub mod recovery_service;
pub mod task_metrics;

pub use controller::TaskController;
pub use dispatcher::{DispatchHandle, DispatchOutcome, TaskDispatcher};
pub use recovery_service::{RecoveryReport, RecoveryService};
