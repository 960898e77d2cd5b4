use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use panel_core::{ExecutionOutcome, PanelError, PanelResult, Task, TaskExecutor, TaskId};
use tokio::process::Command;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::task_log;

/// 运行中的子进程
#[derive(Debug, Clone)]
struct RunningProcess {
    pid: u32,
    log: String,
}

/// Shell任务执行器
///
/// 以 `<shell> -c <command>` 启动子进程，stdout/stderr 直接追加到任务日志文件。
/// 子进程位于独立的进程组，取消时向整个进程组发送 SIGTERM。
pub struct ShellExecutor {
    shell: String,
    /// 正在运行的任务进程
    running_processes: Arc<RwLock<HashMap<TaskId, RunningProcess>>>,
}

impl ShellExecutor {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            running_processes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 在任务日志中记录一行诊断信息，写入失败只告警
    async fn note(log: &str, line: &str) {
        if let Err(e) = task_log::append_line(log, line).await {
            warn!("写入任务日志失败: log={}, error={}", log, e);
        }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new("/bin/sh")
    }
}

#[async_trait]
impl TaskExecutor for ShellExecutor {
    async fn execute(&self, task: &Task) -> PanelResult<ExecutionOutcome> {
        let start_time = Instant::now();

        info!(
            "执行Shell任务: task_id={}, name={}, log={}",
            task.id, task.name, task.log
        );

        let stdout_file = task_log::open_for_append(&task.log).await.map_err(|e| {
            error!("打开任务日志失败: task_id={}, log={}, error={}", task.id, task.log, e);
            PanelError::Spawn(format!("打开日志文件失败 {}: {e}", task.log))
        })?;
        let stderr_file = stdout_file
            .try_clone()
            .map_err(|e| PanelError::Spawn(format!("复制日志文件句柄失败: {e}")))?;

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(&task.shell);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::from(stdout_file));
        cmd.stderr(Stdio::from(stderr_file));
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("启动Shell命令失败: task_id={}, error={}", task.id, e);
                Self::note(&task.log, &format!("启动命令失败: {e}")).await;
                return Err(PanelError::Spawn(e.to_string()));
            }
        };

        // 保存进程ID以便取消
        if let Some(pid) = child.id() {
            let mut processes = self.running_processes.write().await;
            processes.insert(
                task.id,
                RunningProcess {
                    pid,
                    log: task.log.clone(),
                },
            );
        }

        let wait_result = child.wait().await;

        {
            let mut processes = self.running_processes.write().await;
            processes.remove(&task.id);
        }

        let exit_status = wait_result
            .map_err(|e| PanelError::Internal(format!("等待进程结束失败: {e}")))?;

        let outcome = ExecutionOutcome {
            success: exit_status.success(),
            exit_code: exit_status.code(),
            execution_time_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            "Shell任务执行完成: task_id={}, success={}, exit_code={:?}, duration={}ms",
            task.id, outcome.success, outcome.exit_code, outcome.execution_time_ms
        );

        Ok(outcome)
    }

    async fn cancel(&self, task_id: TaskId) -> PanelResult<()> {
        let process = {
            let processes = self.running_processes.read().await;
            processes.get(&task_id).cloned()
        };
        let Some(process) = process else {
            return Err(PanelError::TaskNotRunning { id: task_id });
        };

        #[cfg(unix)]
        {
            let output = Command::new("kill")
                .args(["-TERM", "--", &format!("-{}", process.pid)])
                .output()
                .await
                .map_err(|e| {
                    error!(
                        "执行kill命令失败: task_id={}, pid={}, error={}",
                        task_id, process.pid, e
                    );
                    PanelError::Internal(format!("取消任务失败: {e}"))
                })?;

            if !output.status.success() {
                let error_msg = String::from_utf8_lossy(&output.stderr);
                error!(
                    "取消Shell任务失败: task_id={}, pid={}, error={}",
                    task_id, process.pid, error_msg
                );
                return Err(PanelError::Internal(format!("取消任务失败: {error_msg}")));
            }

            info!("已向任务进程组发送SIGTERM: task_id={}, pid={}", task_id, process.pid);
            Self::note(&process.log, "任务已被手动取消").await;
            Ok(())
        }

        #[cfg(not(unix))]
        {
            warn!("当前平台不支持取消任务: task_id={}, pid={}", task_id, process.pid);
            Err(PanelError::Internal("当前平台不支持取消任务".to_string()))
        }
    }

    async fn is_running(&self, task_id: TaskId) -> bool {
        self.running_processes.read().await.contains_key(&task_id)
    }

    fn name(&self) -> &str {
        "shell"
    }
}
