use crate::store::{AlertRuleUpdate, MonitorStore};
use chrono::{DateTime, Duration, Utc};
use tankmon_common::types::{
    AlertRule, AlertStatus, Channel, CompareOp, Measurement, Metric, Notification,
};
use tempfile::TempDir;

async fn setup() -> (TempDir, MonitorStore) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("tankmon.db").display());
    let store = MonitorStore::new(&url).await.unwrap();
    (dir, store)
}

fn make_rule(id: &str, container_id: Option<&str>) -> AlertRule {
    let now = Utc::now();
    AlertRule {
        id: id.to_string(),
        name: format!("rule {id}"),
        container_id: container_id.map(str::to_string),
        metric: Metric::Temperature,
        operator: CompareOp::Gt,
        threshold: 35.0,
        duration_secs: 0,
        cooldown_secs: 300,
        status: AlertStatus::Active,
        last_triggered_at: None,
        channels: vec![Channel::Inapp],
        webhook_url: None,
        created_at: now,
        updated_at: now,
    }
}

fn make_measurement(id: &str, container: &str, temperature: f64, ts: DateTime<Utc>) -> Measurement {
    Measurement {
        id: id.to_string(),
        container_id: container.to_string(),
        container_name: format!("Tank {container}"),
        temperature,
        ph: 6.7,
        weight: 5150.0,
        volume: 5000.0,
        density: Some(1.03),
        quality_score: Some(100.0),
        timestamp: ts,
    }
}

#[tokio::test]
async fn insert_and_read_back_alert_rule() {
    let (_dir, store) = setup().await;

    let mut rule = make_rule("r-1", Some("c1"));
    rule.channels = vec![Channel::Inapp, Channel::Webhook];
    rule.webhook_url = Some("https://example.com/hook".to_string());
    store.insert_alert_rule(&rule).await.unwrap();

    let stored = store.get_alert_rule("r-1").await.unwrap().unwrap();
    assert_eq!(stored.name, "rule r-1");
    assert_eq!(stored.container_id.as_deref(), Some("c1"));
    assert_eq!(stored.metric, Metric::Temperature);
    assert_eq!(stored.operator, CompareOp::Gt);
    assert_eq!(stored.channels, vec![Channel::Inapp, Channel::Webhook]);
    assert!(stored.last_triggered_at.is_none());
}

#[tokio::test]
async fn candidate_selection_honors_status_and_scope() {
    let (_dir, store) = setup().await;

    store.insert_alert_rule(&make_rule("r-1-global", None)).await.unwrap();
    store.insert_alert_rule(&make_rule("r-2-c1", Some("c1"))).await.unwrap();
    store.insert_alert_rule(&make_rule("r-3-c2", Some("c2"))).await.unwrap();
    let mut paused = make_rule("r-4-paused", Some("c1"));
    paused.status = AlertStatus::Paused;
    store.insert_alert_rule(&paused).await.unwrap();

    let candidates = store.find_active_candidates("c1").await.unwrap();
    let ids: Vec<&str> = candidates.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["r-1-global", "r-2-c1"]);
}

#[tokio::test]
async fn set_last_triggered_at_records_firing() {
    let (_dir, store) = setup().await;

    let inserted = store.insert_alert_rule(&make_rule("r-1", None)).await.unwrap();
    let fired_at = Utc::now();
    assert!(store.set_last_triggered_at("r-1", fired_at).await.unwrap());

    let stored = store.get_alert_rule("r-1").await.unwrap().unwrap();
    let last = stored.last_triggered_at.unwrap();
    assert!((last - fired_at).num_milliseconds().abs() < 1000);
    assert!(stored.updated_at >= inserted.updated_at);

    assert!(!store.set_last_triggered_at("missing", fired_at).await.unwrap());
}

#[tokio::test]
async fn toggle_flips_status() {
    let (_dir, store) = setup().await;

    store.insert_alert_rule(&make_rule("r-1", None)).await.unwrap();
    let toggled = store.toggle_alert_rule("r-1").await.unwrap().unwrap();
    assert_eq!(toggled.status, AlertStatus::Paused);
    let toggled = store.toggle_alert_rule("r-1").await.unwrap().unwrap();
    assert_eq!(toggled.status, AlertStatus::Active);
    assert!(store.toggle_alert_rule("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn update_alert_rule_is_partial() {
    let (_dir, store) = setup().await;

    store.insert_alert_rule(&make_rule("r-1", Some("c1"))).await.unwrap();
    let update = AlertRuleUpdate {
        threshold: Some(37.5),
        container_id: Some(None),
        ..Default::default()
    };
    let updated = store.update_alert_rule("r-1", &update).await.unwrap().unwrap();
    assert_eq!(updated.threshold, 37.5);
    assert!(updated.container_id.is_none());
    // untouched fields survive
    assert_eq!(updated.name, "rule r-1");
    assert_eq!(updated.cooldown_secs, 300);
}

#[tokio::test]
async fn latest_in_window_excludes_current_and_respects_range() {
    let (_dir, store) = setup().await;
    let now = Utc::now();

    let old = make_measurement("m-old", "c1", 36.0, now - Duration::seconds(300));
    let prior = make_measurement("m-prior", "c1", 36.5, now - Duration::seconds(10));
    let current = make_measurement("m-current", "c1", 37.0, now);
    let other = make_measurement("m-other", "c2", 38.0, now - Duration::seconds(5));
    for m in [&old, &prior, &current, &other] {
        store.insert_measurement(m).await.unwrap();
    }

    // window [now-120s, now] for c1, excluding the measurement under evaluation
    let found = store
        .latest_in_window(Some("c1"), now - Duration::seconds(120), now, "m-current")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, "m-prior");

    // nothing else in a narrow window
    let found = store
        .latest_in_window(Some("c1"), now - Duration::seconds(5), now, "m-current")
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn measurements_list_newest_first() {
    let (_dir, store) = setup().await;
    let now = Utc::now();

    for (id, secs_ago) in [("m-1", 60), ("m-2", 30), ("m-3", 0)] {
        let m = make_measurement(id, "c1", 4.0, now - Duration::seconds(secs_ago));
        store.insert_measurement(&m).await.unwrap();
    }

    let listed = store.list_measurements(Some("c1"), 10, 0).await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m-3", "m-2", "m-1"]);
    assert_eq!(store.count_measurements(Some("c1")).await.unwrap(), 3);
    assert!(store.latest_measurement(Some("c2")).await.unwrap().is_none());
}

#[tokio::test]
async fn notifications_round_trip_and_filter() {
    let (_dir, store) = setup().await;
    let now = Utc::now();

    for (id, alert_id, secs_ago) in [("n-1", "r-1", 60), ("n-2", "r-1", 0), ("n-3", "r-2", 30)] {
        let n = Notification {
            id: id.to_string(),
            alert_id: alert_id.to_string(),
            container_id: Some("c1".to_string()),
            metric: Metric::Ph,
            value: 6.1,
            operator: CompareOp::Lt,
            threshold: 6.5,
            message: format!("ALERT {id}"),
            at: now - Duration::seconds(secs_ago),
        };
        store.insert_notification(&n).await.unwrap();
    }

    let all = store.list_notifications(Some("c1"), None, 10, 0).await.unwrap();
    let ids: Vec<&str> = all.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["n-2", "n-3", "n-1"]);

    let for_rule = store.list_notifications(None, Some("r-1"), 10, 0).await.unwrap();
    assert_eq!(for_rule.len(), 2);
    assert_eq!(store.count_notifications(None, Some("r-2")).await.unwrap(), 1);
    assert_eq!(for_rule[0].metric, Metric::Ph);
    assert_eq!(for_rule[0].operator, CompareOp::Lt);
}
