use serde::{Deserialize, Serialize};

/// 任务执行配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// 以 `<shell> -c <command>` 方式执行任务命令
    pub shell: String,
    /// 调度器兜底轮询间隔
    pub poll_interval_seconds: u64,
    /// 查看日志时返回的行数
    pub log_tail_lines: usize,
    /// 启动时把上次遗留的运行中任务标记为失败
    pub recover_on_startup: bool,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            shell: "/bin/sh".to_string(),
            poll_interval_seconds: 5,
            log_tail_lines: 1000,
            recover_on_startup: true,
        }
    }
}

impl TaskConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.shell.trim().is_empty() {
            return Err(anyhow::anyhow!("任务Shell不能为空"));
        }

        if self.poll_interval_seconds == 0 {
            return Err(anyhow::anyhow!("任务轮询间隔必须大于0"));
        }

        if self.log_tail_lines == 0 {
            return Err(anyhow::anyhow!("日志行数必须大于0"));
        }

        Ok(())
    }
}

/// 插件脚本配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// 插件脚本目录，结构为 `<scripts_dir>/<slug>/{install,uninstall,update}.sh`
    pub scripts_dir: String,
    /// 插件任务日志目录，日志文件为 `<log_dir>/<slug>.log`
    pub log_dir: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            scripts_dir: "scripts/plugins".to_string(),
            log_dir: "/tmp".to_string(),
        }
    }
}

impl PluginConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scripts_dir.is_empty() {
            return Err(anyhow::anyhow!("插件脚本目录不能为空"));
        }

        if self.log_dir.is_empty() {
            return Err(anyhow::anyhow!("插件日志目录不能为空"));
        }

        Ok(())
    }
}

/// 面板自身配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// 面板更新命令
    pub update_shell: String,
    /// 面板更新日志
    pub update_log: String,
    /// 面板重启命令
    pub restart_shell: String,
    pub restart_log: String,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            update_shell: "bash scripts/update_panel.sh".to_string(),
            update_log: "/tmp/panel-update.log".to_string(),
            restart_shell: "systemctl restart panel".to_string(),
            restart_log: "/tmp/panel-restart.log".to_string(),
        }
    }
}

impl PanelConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.update_shell.trim().is_empty() {
            return Err(anyhow::anyhow!("面板更新命令不能为空"));
        }

        if self.update_log.is_empty() {
            return Err(anyhow::anyhow!("面板更新日志路径不能为空"));
        }

        if self.restart_shell.trim().is_empty() {
            return Err(anyhow::anyhow!("面板重启命令不能为空"));
        }

        if self.restart_log.is_empty() {
            return Err(anyhow::anyhow!("面板重启日志路径不能为空"));
        }

        Ok(())
    }
}
