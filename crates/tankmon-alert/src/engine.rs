use anyhow::{Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::sync::Arc;
use tankmon_common::id;
use tankmon_common::types::{AlertRule, Channel, Measurement, Notification};
use tankmon_notify::{NotificationHub, WebhookDispatcher};
use tankmon_storage::MonitorStore;

/// Evaluates active alert rules against freshly persisted measurements.
///
/// The evaluator keeps no per-rule state of its own: cooldown state lives on
/// the rule rows (`last_triggered_at`) and the duration-hold check reads the
/// measurement history, so any number of evaluator instances behave alike.
///
/// Callers are expected to invoke [`AlertEvaluator::evaluate`] once per
/// persisted measurement. A duplicate invocation for the same measurement is
/// usually absorbed by cooldown, but that is not guaranteed before the first
/// firing, so invoke-once is a caller responsibility.
pub struct AlertEvaluator {
    store: Arc<MonitorStore>,
    hub: Arc<NotificationHub>,
    webhook: WebhookDispatcher,
}

impl AlertEvaluator {
    pub fn new(store: Arc<MonitorStore>, hub: Arc<NotificationHub>) -> Self {
        Self {
            store,
            hub,
            webhook: WebhookDispatcher::new(),
        }
    }

    /// Run one evaluation pass and return the notifications that fired.
    ///
    /// Every returned notification is already persisted and its rule's
    /// `last_triggered_at` updated. A failure to load the candidate rules
    /// aborts the pass; a storage failure while firing one rule only skips
    /// that rule, so a partial failure yields a shorter list.
    pub async fn evaluate(&self, measurement: &Measurement) -> Result<Vec<Notification>> {
        let candidates = self
            .store
            .find_active_candidates(&measurement.container_id)
            .await
            .context("failed to load candidate alert rules")?;

        let now = Utc::now();
        let mut fired = Vec::new();
        for rule in &candidates {
            match self.evaluate_candidate(rule, measurement, now).await {
                Ok(Some(notification)) => fired.push(notification),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        rule_id = %rule.id,
                        rule_name = %rule.name,
                        error = %e,
                        "Skipping alert rule after storage failure"
                    );
                }
            }
        }
        Ok(fired)
    }

    async fn evaluate_candidate(
        &self,
        rule: &AlertRule,
        measurement: &Measurement,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>> {
        let Some(value) = measurement.metric_value(rule.metric) else {
            return Ok(None);
        };
        if !value.is_finite() {
            return Ok(None);
        }
        if !rule.operator.check(value, rule.threshold) {
            return Ok(None);
        }
        if !self.violation_held(rule, measurement).await? {
            return Ok(None);
        }
        if rule.within_cooldown(now) {
            tracing::debug!(
                rule_id = %rule.id,
                container_id = %measurement.container_id,
                "Alert suppressed (cooldown)"
            );
            return Ok(None);
        }

        let notification = Notification {
            id: id::next_id(),
            alert_id: rule.id.clone(),
            container_id: Some(measurement.container_id.clone()),
            metric: rule.metric,
            value,
            operator: rule.operator,
            threshold: rule.threshold,
            message: build_message(rule, value, measurement.timestamp),
            at: now,
        };
        let stored = self.store.insert_notification(&notification).await?;
        self.store.set_last_triggered_at(&rule.id, now).await?;

        tracing::info!(
            rule_id = %rule.id,
            rule_name = %rule.name,
            container_id = %measurement.container_id,
            value,
            threshold = rule.threshold,
            "Alert fired"
        );

        // Delivery is best-effort from here on; persistence already succeeded.
        self.hub.publish(&stored);
        if rule.channels.contains(&Channel::Webhook) {
            if let Some(url) = &rule.webhook_url {
                self.webhook.dispatch(url, &stored);
            }
        }

        Ok(Some(stored))
    }

    /// Duration-hold check.
    ///
    /// Best-effort approximation: only the most recent sample preceding the
    /// current measurement inside `[ts - duration, ts]` is inspected; if it
    /// also violates, the violation is assumed continuous. An isolated first
    /// sample therefore never fires a duration-gated rule. The window is
    /// always scoped to the measurement's container, keeping containers
    /// independent even under unscoped rules.
    async fn violation_held(&self, rule: &AlertRule, measurement: &Measurement) -> Result<bool> {
        if rule.duration_secs == 0 {
            return Ok(true);
        }
        let since = measurement.timestamp - Duration::seconds(rule.duration_secs);
        let prior = self
            .store
            .latest_in_window(
                Some(&measurement.container_id),
                since,
                measurement.timestamp,
                &measurement.id,
            )
            .await?;
        let Some(prior) = prior else { return Ok(false) };
        let Some(value) = prior.metric_value(rule.metric) else {
            return Ok(false);
        };
        Ok(value.is_finite() && rule.operator.check(value, rule.threshold))
    }
}

fn build_message(rule: &AlertRule, value: f64, at: DateTime<Utc>) -> String {
    format!(
        "ALERT {}: {} {} {} (value={} at {})",
        rule.name,
        rule.metric,
        rule.operator,
        rule.threshold,
        value,
        at.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}
