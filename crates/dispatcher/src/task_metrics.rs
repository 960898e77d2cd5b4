//! 任务中心指标
//!
//! 未安装 recorder 时这些调用都是空操作。

use metrics::{counter, histogram};
use panel_core::TaskStatus;
use std::time::Duration;

/// 提交方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    Exclusive,
    Queued,
}

impl SubmitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitMode::Exclusive => "exclusive",
            SubmitMode::Queued => "queued",
        }
    }
}

pub fn record_submitted(mode: SubmitMode) {
    counter!("panel_tasks_submitted_total", "mode" => mode.as_str()).increment(1);
}

pub fn record_rejected_busy() {
    counter!("panel_tasks_rejected_total", "reason" => "busy").increment(1);
}

pub fn record_finished(status: TaskStatus, duration: Duration) {
    counter!("panel_tasks_finished_total", "status" => status.as_str()).increment(1);
    histogram!("panel_task_duration_seconds").record(duration.as_secs_f64());
}
