//! 配置管理
//!
//! 配置按以下顺序叠加，后者覆盖前者：
//!
//! 1. 内置默认值
//! 2. TOML 配置文件
//! 3. `PANEL_` 前缀的环境变量，层级之间用 `__` 分隔
//!
//! ```rust,no_run
//! use panel_core::config::AppConfig;
//!
//! let config = AppConfig::load(Some("config/panel.toml")).unwrap();
//! println!("监听地址: {}", config.api.bind_address);
//! ```

pub mod models;

pub use models::*;
