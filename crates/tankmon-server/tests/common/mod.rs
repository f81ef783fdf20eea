#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tankmon_alert::AlertEvaluator;
use tankmon_notify::NotificationHub;
use tankmon_server::app;
use tankmon_server::config::ServerConfig;
use tankmon_server::state::AppState;
use tankmon_storage::MonitorStore;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
}

pub async fn build_test_context() -> Result<TestContext> {
    tankmon_common::id::init(1, 1);

    let temp_dir = tempfile::tempdir()?;
    let url = format!(
        "sqlite://{}?mode=rwc",
        temp_dir.path().join("tankmon.db").display()
    );
    let store = Arc::new(MonitorStore::new(&url).await?);
    let hub = Arc::new(NotificationHub::new());
    let evaluator = Arc::new(AlertEvaluator::new(store.clone(), hub.clone()));

    let state = AppState {
        store,
        evaluator,
        hub,
        start_time: Utc::now(),
        config: Arc::new(ServerConfig::default()),
    };
    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        state,
        app,
    })
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    path: &str,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let builder = Request::builder().method(method).uri(path);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    // axum's own rejections (e.g. enum parse failures) are plain text
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    Ok((status, value))
}
