use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::entities::alert_rule::{self, Column, Entity};
use crate::error::StorageError;
use crate::store::MonitorStore;
use tankmon_common::types::{AlertRule, AlertStatus, Channel};

/// Partial update for an alert rule; `None` leaves the field untouched.
/// Double-`Option` fields distinguish "leave" from "clear".
#[derive(Debug, Clone, Default)]
pub struct AlertRuleUpdate {
    pub name: Option<String>,
    pub container_id: Option<Option<String>>,
    pub metric: Option<tankmon_common::types::Metric>,
    pub operator: Option<tankmon_common::types::CompareOp>,
    pub threshold: Option<f64>,
    pub duration_secs: Option<i64>,
    pub cooldown_secs: Option<i64>,
    pub status: Option<AlertStatus>,
    pub channels: Option<Vec<Channel>>,
    pub webhook_url: Option<Option<String>>,
}

fn to_rule(m: alert_rule::Model) -> Result<AlertRule> {
    let metric = m.metric.parse().map_err(|_| StorageError::Corrupt {
        entity: "alert_rule",
        column: "metric",
        value: m.metric.clone(),
    })?;
    let operator = m.operator.parse().map_err(|_| StorageError::Corrupt {
        entity: "alert_rule",
        column: "operator",
        value: m.operator.clone(),
    })?;
    let status = m.status.parse().map_err(|_| StorageError::Corrupt {
        entity: "alert_rule",
        column: "status",
        value: m.status.clone(),
    })?;
    let channels: Vec<Channel> = serde_json::from_str(&m.channels).map_err(StorageError::Json)?;
    Ok(AlertRule {
        id: m.id,
        name: m.name,
        container_id: m.container_id,
        metric,
        operator,
        threshold: m.threshold,
        duration_secs: m.duration_secs,
        cooldown_secs: m.cooldown_secs,
        status,
        last_triggered_at: m.last_triggered_at.map(|t| t.with_timezone(&Utc)),
        channels,
        webhook_url: m.webhook_url,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

impl MonitorStore {
    pub async fn insert_alert_rule(&self, rule: &AlertRule) -> Result<AlertRule> {
        let now = Utc::now().fixed_offset();
        let am = alert_rule::ActiveModel {
            id: Set(rule.id.clone()),
            name: Set(rule.name.clone()),
            container_id: Set(rule.container_id.clone()),
            metric: Set(rule.metric.to_string()),
            operator: Set(rule.operator.to_string()),
            threshold: Set(rule.threshold),
            duration_secs: Set(rule.duration_secs),
            cooldown_secs: Set(rule.cooldown_secs),
            status: Set(rule.status.to_string()),
            last_triggered_at: Set(None),
            channels: Set(serde_json::to_string(&rule.channels).map_err(StorageError::Json)?),
            webhook_url: Set(rule.webhook_url.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        to_rule(model)
    }

    pub async fn get_alert_rule(&self, id: &str) -> Result<Option<AlertRule>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        model.map(to_rule).transpose()
    }

    /// List rules newest-updated first, optionally filtered by status and
    /// container scope.
    pub async fn list_alert_rules(
        &self,
        status: Option<AlertStatus>,
        container_id: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<AlertRule>> {
        let mut q = Entity::find();
        if let Some(st) = status {
            q = q.filter(Column::Status.eq(st.to_string()));
        }
        if let Some(cid) = container_id {
            q = q.filter(Column::ContainerId.eq(cid));
        }
        let rows = q
            .order_by(Column::UpdatedAt, Order::Desc)
            .limit(limit)
            .offset(offset)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_rule).collect()
    }

    pub async fn count_alert_rules(
        &self,
        status: Option<AlertStatus>,
        container_id: Option<&str>,
    ) -> Result<u64> {
        let mut q = Entity::find();
        if let Some(st) = status {
            q = q.filter(Column::Status.eq(st.to_string()));
        }
        if let Some(cid) = container_id {
            q = q.filter(Column::ContainerId.eq(cid));
        }
        Ok(q.count(self.db()).await?)
    }

    pub async fn update_alert_rule(
        &self,
        id: &str,
        update: &AlertRuleUpdate,
    ) -> Result<Option<AlertRule>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        let Some(m) = model else { return Ok(None) };

        let mut am: alert_rule::ActiveModel = m.into();
        if let Some(name) = &update.name {
            am.name = Set(name.clone());
        }
        if let Some(cid) = &update.container_id {
            am.container_id = Set(cid.clone());
        }
        if let Some(metric) = update.metric {
            am.metric = Set(metric.to_string());
        }
        if let Some(op) = update.operator {
            am.operator = Set(op.to_string());
        }
        if let Some(threshold) = update.threshold {
            am.threshold = Set(threshold);
        }
        if let Some(secs) = update.duration_secs {
            am.duration_secs = Set(secs);
        }
        if let Some(secs) = update.cooldown_secs {
            am.cooldown_secs = Set(secs);
        }
        if let Some(status) = update.status {
            am.status = Set(status.to_string());
        }
        if let Some(channels) = &update.channels {
            am.channels = Set(serde_json::to_string(channels).map_err(StorageError::Json)?);
        }
        if let Some(url) = &update.webhook_url {
            am.webhook_url = Set(url.clone());
        }
        am.updated_at = Set(Utc::now().fixed_offset());
        let updated = am.update(self.db()).await?;
        Ok(Some(to_rule(updated)?))
    }

    pub async fn delete_alert_rule(&self, id: &str) -> Result<bool> {
        let res = Entity::delete_by_id(id).exec(self.db()).await?;
        Ok(res.rows_affected > 0)
    }

    /// Flip a rule between active and paused.
    pub async fn toggle_alert_rule(&self, id: &str) -> Result<Option<AlertRule>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        let Some(m) = model else { return Ok(None) };

        let next = if m.status == AlertStatus::Active.to_string() {
            AlertStatus::Paused
        } else {
            AlertStatus::Active
        };
        let mut am: alert_rule::ActiveModel = m.into();
        am.status = Set(next.to_string());
        am.updated_at = Set(Utc::now().fixed_offset());
        let updated = am.update(self.db()).await?;
        Ok(Some(to_rule(updated)?))
    }

    /// Candidate rules for one measurement: active, and either unscoped or
    /// scoped to the measurement's container. Returned in creation order so
    /// evaluation is deterministic; corrupt rows are skipped with a warning.
    pub async fn find_active_candidates(&self, container_id: &str) -> Result<Vec<AlertRule>> {
        let rows = Entity::find()
            .filter(Column::Status.eq(AlertStatus::Active.to_string()))
            .filter(
                Condition::any()
                    .add(Column::ContainerId.is_null())
                    .add(Column::ContainerId.eq(container_id)),
            )
            .order_by(Column::CreatedAt, Order::Asc)
            .order_by(Column::Id, Order::Asc)
            .all(self.db())
            .await?;

        let mut rules = Vec::with_capacity(rows.len());
        for row in rows {
            let rule_id = row.id.clone();
            match to_rule(row) {
                Ok(rule) => rules.push(rule),
                Err(e) => {
                    tracing::warn!(rule_id = %rule_id, error = %e, "Skipping corrupt alert rule");
                }
            }
        }
        Ok(rules)
    }

    /// Record a firing. Returns false when the rule no longer exists.
    pub async fn set_last_triggered_at(&self, id: &str, at: DateTime<Utc>) -> Result<bool> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        let Some(m) = model else { return Ok(false) };

        let mut am: alert_rule::ActiveModel = m.into();
        am.last_triggered_at = Set(Some(at.fixed_offset()));
        am.updated_at = Set(Utc::now().fixed_offset());
        am.update(self.db()).await?;
        Ok(true)
    }
}
