mod common;

use axum::http::StatusCode;
use common::{build_test_context, request_json};
use serde_json::json;

#[tokio::test]
async fn ingestion_fires_alert_then_cooldown_suppresses() {
    let ctx = build_test_context().await.unwrap();

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/alerts",
        Some(json!({
            "name": "temp high",
            "metric": "temperature",
            "operator": ">",
            "threshold": 35.0
        })),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    let rule_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["cooldownSec"].as_i64(), Some(300));
    assert_eq!(body["data"]["status"].as_str(), Some("active"));

    // a live subscriber watches the hub like the SSE transport does
    let mut sub = ctx.state.hub.subscribe();

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/measurements",
        Some(json!({
            "containerId": "c1",
            "containerName": "Tank 1",
            "temperature": 36.0,
            "pH": 6.7,
            "weight": 5150.0,
            "volume": 5000.0
        })),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    let fired = body["data"]["alertsTriggered"].as_array().unwrap();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0]["alertId"].as_str(), Some(rule_id.as_str()));
    assert_eq!(fired[0]["value"].as_f64(), Some(36.0));
    assert_eq!(fired[0]["operator"].as_str(), Some(">"));
    assert_eq!(fired[0]["threshold"].as_f64(), Some(35.0));
    // derived fields are present on the stored measurement
    assert_eq!(body["data"]["measurement"]["density"].as_f64(), Some(1.03));
    assert!(body["data"]["measurement"]["qualityScore"].as_f64().is_some());

    // the live subscriber received an identical copy
    let live = sub.try_recv().expect("hub subscriber should get the firing");
    assert_eq!(live.alert_id, rule_id);

    // a second violating measurement lands inside the cooldown window
    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/measurements",
        Some(json!({
            "containerId": "c1",
            "containerName": "Tank 1",
            "temperature": 37.0,
            "pH": 6.7,
            "weight": 5150.0,
            "volume": 5000.0
        })),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["data"]["alertsTriggered"].as_array().unwrap().is_empty());

    // exactly one notification was stored
    let (status, body) = request_json(&ctx.app, "GET", "/v1/notifications", None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"].as_u64(), Some(1));
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

    // and the rule remembers its last firing
    let (status, body) = request_json(&ctx.app, "GET", &format!("/v1/alerts/{rule_id}"), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(!body["data"]["lastTriggeredAt"].is_null());
}

#[tokio::test]
async fn toggled_off_rules_do_not_fire() {
    let ctx = build_test_context().await.unwrap();

    let (_, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/alerts",
        Some(json!({
            "name": "temp high",
            "metric": "temperature",
            "operator": ">",
            "threshold": 35.0
        })),
    )
    .await
    .unwrap();
    let rule_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        &format!("/v1/alerts/{rule_id}/toggle"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"].as_str(), Some("paused"));

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/measurements",
        Some(json!({
            "containerId": "c1",
            "containerName": "Tank 1",
            "temperature": 40.0,
            "pH": 6.7,
            "weight": 5150.0,
            "volume": 5000.0
        })),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["data"]["alertsTriggered"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn sensor_validation_rejects_out_of_range_values() {
    let ctx = build_test_context().await.unwrap();

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/measurements",
        Some(json!({
            "containerId": "c1",
            "containerName": "Tank 1",
            "temperature": 36.0,
            "pH": 20.0,
            "weight": -3.0,
            "volume": 5000.0
        })),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let msg = body["err_msg"].as_str().unwrap();
    assert!(msg.contains("pH"));
    assert!(msg.contains("weight"));

    // nothing was stored
    let (status, _) = request_json(&ctx.app, "GET", "/v1/measurements/latest", None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rule_validation_rejects_malformed_definitions() {
    let ctx = build_test_context().await.unwrap();

    // empty name
    let (status, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/alerts",
        Some(json!({
            "name": "  ",
            "metric": "temperature",
            "operator": ">",
            "threshold": 35.0
        })),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // unknown metric is rejected at the serde boundary
    let (status, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/alerts",
        Some(json!({
            "name": "density watch",
            "metric": "density",
            "operator": ">",
            "threshold": 1.05
        })),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // webhook channel demands a URL
    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/alerts",
        Some(json!({
            "name": "hooked",
            "metric": "weight",
            "operator": ">=",
            "threshold": 5500.0,
            "channels": ["inapp", "webhook"]
        })),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["err_msg"].as_str().unwrap().contains("webhookUrl"));
}

#[tokio::test]
async fn alert_crud_round_trip() {
    let ctx = build_test_context().await.unwrap();

    let (_, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/alerts",
        Some(json!({
            "name": "ph low",
            "containerId": "c7",
            "metric": "pH",
            "operator": "<",
            "threshold": 6.5,
            "durationSec": 120
        })),
    )
    .await
    .unwrap();
    let rule_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = request_json(
        &ctx.app,
        "PATCH",
        &format!("/v1/alerts/{rule_id}"),
        Some(json!({ "threshold": 6.2, "containerId": null })),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["threshold"].as_f64(), Some(6.2));
    assert!(body["data"]["containerId"].is_null());
    // untouched fields survive a partial update
    assert_eq!(body["data"]["durationSec"].as_i64(), Some(120));

    let (status, body) = request_json(&ctx.app, "GET", "/v1/alerts?status=active", None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"].as_u64(), Some(1));

    let (status, _) = request_json(&ctx.app, "DELETE", &format!("/v1/alerts/{rule_id}"), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request_json(&ctx.app, "GET", &format!("/v1/alerts/{rule_id}"), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_ok() {
    let ctx = build_test_context().await.unwrap();
    let (status, body) = request_json(&ctx.app, "GET", "/v1/health", None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["storage_status"].as_str(), Some("ok"));
}
