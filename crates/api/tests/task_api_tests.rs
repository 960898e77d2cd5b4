use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use panel_api::{create_app, AppState, PluginTaskFactory};
use panel_core::config::{ApiConfig, ObservabilityConfig, PanelConfig};
use panel_core::{NewTask, TaskRepository, TaskStatus};
use panel_dispatcher::{TaskController, TaskDispatcher};
use panel_infrastructure::InMemoryTaskRepository;
use panel_worker::ShellExecutor;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    app: Router,
    repo: Arc<InMemoryTaskRepository>,
    dispatcher: Arc<TaskDispatcher>,
    scripts_dir: PathBuf,
    log_dir: PathBuf,
    _dir: TempDir,
}

fn build_app() -> Result<TestApp> {
    let dir = TempDir::new()?;
    let scripts_dir = dir.path().join("scripts");
    let log_dir = dir.path().join("logs");
    std::fs::create_dir_all(&scripts_dir)?;

    let repo = Arc::new(InMemoryTaskRepository::new());
    let executor = Arc::new(ShellExecutor::default());
    let dispatcher = Arc::new(TaskDispatcher::new(
        repo.clone(),
        executor.clone(),
        Duration::from_secs(60),
    ));
    let controller = Arc::new(TaskController::new(
        repo.clone(),
        executor,
        dispatcher.handle(),
        1000,
    ));

    let panel = PanelConfig {
        update_shell: "echo updating".to_string(),
        update_log: log_dir.join("panel-update.log").display().to_string(),
        restart_shell: "echo restarting".to_string(),
        restart_log: log_dir.join("panel-restart.log").display().to_string(),
    };
    let state = AppState {
        controller,
        plugins: Arc::new(PluginTaskFactory::new(&scripts_dir, &log_dir)),
        panel: Arc::new(panel),
        metrics: None,
    };
    let app = create_app(state, &ApiConfig::default(), &ObservabilityConfig::default());

    Ok(TestApp {
        app,
        repo,
        dispatcher,
        scripts_dir,
        log_dir,
        _dir: dir,
    })
}

impl TestApp {
    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.app.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Ok((status, value))
    }

    fn add_script(&self, slug: &str, action: &str, content: &str) -> Result<()> {
        let dir = self.scripts_dir.join(slug);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join(format!("{action}.sh")), content)?;
        Ok(())
    }
}

#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let t = build_app()?;
    let (status, body) = t.send("GET", "/health", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn test_panel_update_is_exclusive() -> Result<()> {
    let t = build_app()?;

    let (status, body) = t.send("GET", "/api/task/status", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["active"], false);

    let (status, body) = t.send("POST", "/api/panel/update", None).await?;
    assert_eq!(status, StatusCode::OK);
    let id = body["data"].as_i64().expect("应返回任务ID");

    let (_, body) = t.send("GET", "/api/task/status", None).await?;
    assert_eq!(body["data"]["active"], true);

    let (status, body) = t.send("POST", "/api/panel/update", None).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["type"], "TASK_CENTER_BUSY");
    assert_eq!(body["error"]["code"], 409);

    t.dispatcher.drain().await?;

    let (_, body) = t.send("GET", "/api/task/status", None).await?;
    assert_eq!(body["data"]["active"], false);

    let (status, body) = t.send("GET", &format!("/api/task/{id}"), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "done");
    assert_eq!(body["data"]["name"], "更新面板");

    let (status, body) = t.send("GET", &format!("/api/task/log?id={id}"), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "updating");
    Ok(())
}

#[tokio::test]
async fn test_panel_restart_waits_for_idle_task_center() -> Result<()> {
    let t = build_app()?;
    t.add_script("redis", "install", "echo redis-installed")?;

    let (status, _) = t
        .send("POST", "/api/plugin/install", Some(json!({"slug": "redis"})))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = t.send("POST", "/api/panel/restart", None).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["type"], "TASK_CENTER_BUSY");

    t.dispatcher.drain().await?;

    let (status, body) = t.send("POST", "/api/panel/restart", None).await?;
    assert_eq!(status, StatusCode::OK);
    let id = body["data"].as_i64().expect("应返回任务ID");

    let (status, _) = t.send("POST", "/api/panel/update", None).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    t.dispatcher.drain().await?;

    let (_, body) = t.send("GET", &format!("/api/task/{id}"), None).await?;
    assert_eq!(body["data"]["status"], "done");
    assert_eq!(body["data"]["name"], "重启面板");

    let (_, body) = t.send("GET", &format!("/api/task/log?id={id}"), None).await?;
    assert_eq!(body["data"], "restarting");
    Ok(())
}

#[tokio::test]
async fn test_plugin_tasks_queue_and_run() -> Result<()> {
    let t = build_app()?;
    t.add_script("redis", "install", "echo redis-installed")?;
    t.add_script("mysql", "install", "echo mysql-installed; exit 2")?;

    let (status, body) = t
        .send("POST", "/api/plugin/install", Some(json!({"slug": "redis"})))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let redis_id = body["data"].as_i64().expect("应返回任务ID");

    // 插件任务在已有活跃任务时仍可排队
    let (status, body) = t
        .send("POST", "/api/plugin/install", Some(json!({"slug": "mysql"})))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let mysql_id = body["data"].as_i64().expect("应返回任务ID");
    assert!(mysql_id > redis_id);

    let (status, _) = t.send("POST", "/api/panel/update", None).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    assert_eq!(t.dispatcher.drain().await?, 2);

    let redis = t.repo.get_by_id(redis_id).await?.expect("任务应存在");
    assert_eq!(redis.status, TaskStatus::Done);
    assert_eq!(redis.name, "安装插件 redis");
    assert_eq!(redis.log, t.log_dir.join("redis.log").display().to_string());

    let mysql = t.repo.get_by_id(mysql_id).await?.expect("任务应存在");
    assert_eq!(mysql.status, TaskStatus::Failed);

    let (_, body) = t.send("GET", &format!("/api/task/log?id={mysql_id}"), None).await?;
    assert_eq!(body["data"], "mysql-installed");
    Ok(())
}

#[tokio::test]
async fn test_plugin_request_validation() -> Result<()> {
    let t = build_app()?;
    t.add_script("redis", "install", "true")?;

    let (status, body) = t
        .send("POST", "/api/plugin/install", Some(json!({"slug": "../redis"})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "INVALID_TASK_PARAMS");

    let (status, _) = t
        .send("POST", "/api/plugin/uninstall", Some(json!({"slug": "redis"})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t
        .send("POST", "/api/plugin/restart", Some(json!({"slug": "redis"})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, total) = t.repo.list_paged(1, 10).await?;
    assert_eq!(total, 0);
    Ok(())
}

#[tokio::test]
async fn test_list_pagination() -> Result<()> {
    let t = build_app()?;
    for i in 1..=25 {
        t.repo
            .create(&NewTask::new(format!("task-{i}"), "true", "/tmp/x.log"))
            .await?;
    }

    let (status, body) = t.send("GET", "/api/task/list?page=3&limit=10", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 25);
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(5));
    assert_eq!(body["data"]["total_pages"], 3);

    let (_, body) = t.send("GET", "/api/task/list?page=10&limit=10", None).await?;
    assert_eq!(body["data"]["total"], 25);
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(0));

    let (_, body) = t.send("GET", "/api/task/list", None).await?;
    assert_eq!(body["data"]["page"], 1);
    assert_eq!(body["data"]["page_size"], 10);
    assert_eq!(body["data"]["items"][0]["name"], "task-25");

    let (_, body) = t.send("GET", "/api/task/list?page=0&limit=0", None).await?;
    assert_eq!(body["data"]["page"], 1);
    assert_eq!(body["data"]["page_size"], 1);

    let (status, body) = t
        .send("GET", &format!("/api/task/list?page=2&limit={}", i64::MAX), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 25);
    assert_eq!(body["data"]["total_pages"], 1);
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn test_delete_task() -> Result<()> {
    let t = build_app()?;
    let task = t
        .repo
        .create(&NewTask::new("安装插件 redis", "true", "/tmp/redis.log"))
        .await?;

    let (status, _) = t.send("DELETE", &format!("/api/task?id={}", task.id), None).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = t.send("DELETE", &format!("/api/task?id={}", task.id), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "TASK_NOT_FOUND");

    let (status, _) = t.send("GET", &format!("/api/task/{}", task.id), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_log_unavailable_and_cancel_conflict() -> Result<()> {
    let t = build_app()?;
    let missing_log = t.log_dir.join("missing.log").display().to_string();
    let task = t
        .repo
        .create(&NewTask::new("安装插件 php", "true", missing_log))
        .await?;

    let (status, body) = t.send("GET", &format!("/api/task/log?id={}", task.id), None).await?;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["error"]["message"], "日志已被清理");

    let (status, _) = t.send("GET", "/api/task/log?id=999", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = t
        .send("POST", &format!("/api/task/{}/cancel", task.id), None)
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["type"], "TASK_NOT_RUNNING");
    Ok(())
}

#[tokio::test]
async fn test_malformed_requests_use_error_envelope() -> Result<()> {
    let t = build_app()?;

    let (status, body) = t.send("GET", "/api/task/log", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "BAD_REQUEST");
    assert_eq!(body["error"]["code"], 400);

    let (status, body) = t.send("DELETE", "/api/task?id=abc", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "BAD_REQUEST");

    let (status, body) = t.send("GET", "/api/task/abc", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "BAD_REQUEST");

    let request = Request::builder()
        .method("POST")
        .uri("/api/plugin/install")
        .header("content-type", "application/json")
        .body(Body::from("{\"slug\":"))?;
    let response = t.app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["error"]["type"], "BAD_REQUEST");

    let (_, total) = t.repo.list_paged(1, 10).await?;
    assert_eq!(total, 0);
    Ok(())
}

#[tokio::test]
async fn test_metrics_route_disabled_without_recorder() -> Result<()> {
    let t = build_app()?;
    let (status, _) = t.send("GET", "/metrics", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
