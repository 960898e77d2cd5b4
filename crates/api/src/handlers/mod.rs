pub mod health;
pub mod metrics;
pub mod panel;
pub mod plugins;
pub mod tasks;
