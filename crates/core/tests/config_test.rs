use anyhow::Result;
use panel_core::config::AppConfig;
use std::io::Write;
use tempfile::NamedTempFile;

/// 配置文件覆盖默认值，未出现的字段保持默认
#[test]
fn test_load_from_file_and_env() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        r#"
[database]
url = "sqlite:/var/lib/panel/panel.db"

[task]
shell = "/bin/bash"
poll_interval_seconds = 2

[plugin]
scripts_dir = "/opt/panel/scripts/plugins"
"#
    )?;

    std::env::set_var("PANEL_API__BIND_ADDRESS", "0.0.0.0:9999");
    std::env::set_var("PANEL_TASK__LOG_TAIL_LINES", "200");

    let path = file.path().to_string_lossy().to_string();
    let loaded = AppConfig::load(Some(&path));

    std::env::remove_var("PANEL_API__BIND_ADDRESS");
    std::env::remove_var("PANEL_TASK__LOG_TAIL_LINES");

    let config = loaded?;
    assert_eq!(config.database.url, "sqlite:/var/lib/panel/panel.db");
    assert_eq!(config.task.shell, "/bin/bash");
    assert_eq!(config.task.poll_interval_seconds, 2);
    assert_eq!(config.plugin.scripts_dir, "/opt/panel/scripts/plugins");
    assert_eq!(config.plugin.log_dir, "/tmp");
    assert_eq!(config.api.bind_address, "0.0.0.0:9999");
    assert_eq!(config.task.log_tail_lines, 200);
    assert!(config.task.recover_on_startup);

    Ok(())
}

/// 配置文件中的非法值在加载阶段即被拒绝
#[test]
fn test_load_rejects_invalid_file() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        r#"
[task]
poll_interval_seconds = 0
"#
    )?;

    let path = file.path().to_string_lossy().to_string();
    assert!(AppConfig::load(Some(&path)).is_err());
    Ok(())
}
