pub mod sqlite;

pub use sqlite::SqliteTaskRepository;

use anyhow::{Context, Result};
use panel_core::config::models::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

const CREATE_TASKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    shell TEXT NOT NULL,
    log TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'waiting',
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL
)
"#;

const CREATE_STATUS_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks (status)";

pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.connection_timeout_seconds);
        let options = SqliteConnectOptions::from_str(&config.url)
            .with_context(|| format!("无效的数据库URL: {}", config.url))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(timeout)
            .connect_with(options)
            .await
            .with_context(|| format!("连接数据库失败: {}", config.url))?;

        debug!("数据库连接池已创建: {}", config.url);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// 创建任务表及状态索引，可重复执行
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(CREATE_TASKS_TABLE)
            .execute(&self.pool)
            .await
            .context("创建任务表失败")?;
        sqlx::query(CREATE_STATUS_INDEX)
            .execute(&self.pool)
            .await
            .context("创建任务状态索引失败")?;
        info!("数据库迁移完成");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
