//! 插件任务的生产者
//!
//! 把插件操作请求转换为任务定义。脚本约定位于 `<scripts_dir>/<slug>/<action>.sh`，
//! 日志写入 `<log_dir>/<slug>.log`，同一插件的多次操作共用一个日志文件。

use panel_core::{config::PluginConfig, NewTask, PanelError, PanelResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginAction {
    Install,
    Uninstall,
    Update,
}

impl PluginAction {
    pub fn script_name(&self) -> &'static str {
        match self {
            PluginAction::Install => "install.sh",
            PluginAction::Uninstall => "uninstall.sh",
            PluginAction::Update => "update.sh",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PluginAction::Install => "安装插件",
            PluginAction::Uninstall => "卸载插件",
            PluginAction::Update => "更新插件",
        }
    }
}

impl FromStr for PluginAction {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "install" => Ok(PluginAction::Install),
            "uninstall" => Ok(PluginAction::Uninstall),
            "update" => Ok(PluginAction::Update),
            _ => Err(PanelError::InvalidTaskParams(format!("不支持的插件操作: {s}"))),
        }
    }
}

/// 插件任务工厂
#[derive(Debug, Clone)]
pub struct PluginTaskFactory {
    scripts_dir: PathBuf,
    log_dir: PathBuf,
}

impl PluginTaskFactory {
    pub fn new(scripts_dir: impl Into<PathBuf>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
            log_dir: log_dir.into(),
        }
    }

    pub fn from_config(config: &PluginConfig) -> Self {
        Self::new(&config.scripts_dir, &config.log_dir)
    }

    /// 校验插件标识与脚本后生成任务定义
    pub async fn build(&self, action: PluginAction, slug: &str) -> PanelResult<NewTask> {
        validate_slug(slug)?;

        let script = self.scripts_dir.join(slug).join(action.script_name());
        let exists = tokio::fs::try_exists(&script).await.unwrap_or(false);
        if !exists {
            return Err(PanelError::InvalidTaskParams(format!(
                "插件 {slug} 不支持{}: 脚本 {} 不存在",
                action.label(),
                script.display()
            )));
        }

        Ok(NewTask::new(
            format!("{} {}", action.label(), slug),
            format!("bash {}", shell_quote(&script)),
            self.log_dir.join(format!("{slug}.log")).display().to_string(),
        ))
    }
}

fn validate_slug(slug: &str) -> PanelResult<()> {
    let valid = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(PanelError::InvalidTaskParams(format!("无效的插件标识: {slug}")))
    }
}

/// 单引号包裹路径，内部的单引号转义为 `'\''`
fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', r"'\''"))
}
