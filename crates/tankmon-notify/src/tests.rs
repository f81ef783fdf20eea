use crate::hub::NotificationHub;
use chrono::Utc;
use tankmon_common::types::{CompareOp, Metric, Notification};

fn make_notification(id: &str) -> Notification {
    Notification {
        id: id.to_string(),
        alert_id: "r-1".to_string(),
        container_id: Some("c1".to_string()),
        metric: Metric::Temperature,
        value: 36.0,
        operator: CompareOp::Gt,
        threshold: 35.0,
        message: "ALERT temp high: temperature > 35 (value=36)".to_string(),
        at: Utc::now(),
    }
}

#[tokio::test]
async fn every_subscriber_receives_an_identical_copy() {
    let hub = NotificationHub::new();
    let mut subs = [hub.subscribe(), hub.subscribe(), hub.subscribe()];

    let delivered = hub.publish(&make_notification("n-1"));
    assert_eq!(delivered, 3);

    for sub in &mut subs {
        let received = sub.try_recv().expect("subscriber should have a copy");
        assert_eq!(received.id, "n-1");
        assert_eq!(received.value, 36.0);
    }
}

#[tokio::test]
async fn broken_subscriber_does_not_block_the_others() {
    let hub = NotificationHub::new();
    let mut first = hub.subscribe();
    let broken = hub.subscribe();
    let mut third = hub.subscribe();

    // simulate a consumer that died without unsubscribing
    drop(broken);

    let delivered = hub.publish(&make_notification("n-1"));
    assert_eq!(delivered, 2);
    assert!(first.try_recv().is_some());
    assert!(third.try_recv().is_some());

    // the dead subscriber was pruned during publish
    assert_eq!(hub.subscriber_count(), 2);
}

#[tokio::test]
async fn unsubscribe_removes_the_handle() {
    let hub = NotificationHub::new();
    let first = hub.subscribe();
    let mut second = hub.subscribe();
    assert_eq!(hub.subscriber_count(), 2);

    assert!(hub.unsubscribe(first.id()));
    assert!(!hub.unsubscribe(first.id()));
    assert_eq!(hub.subscriber_count(), 1);

    hub.publish(&make_notification("n-1"));
    assert!(second.try_recv().is_some());
}

#[tokio::test]
async fn publish_without_subscribers_is_a_noop() {
    let hub = NotificationHub::new();
    assert_eq!(hub.publish(&make_notification("n-1")), 0);
}

#[tokio::test]
async fn subscription_survives_across_publishes() {
    let hub = NotificationHub::new();
    let mut sub = hub.subscribe();

    hub.publish(&make_notification("n-1"));
    hub.publish(&make_notification("n-2"));

    assert_eq!(sub.recv().await.unwrap().id, "n-1");
    assert_eq!(sub.recv().await.unwrap().id, "n-2");
}
