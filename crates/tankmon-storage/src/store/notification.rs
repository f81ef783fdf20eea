use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

use crate::entities::notification::{self, Column, Entity};
use crate::error::StorageError;
use crate::store::MonitorStore;
use tankmon_common::types::Notification;

fn to_notification(m: notification::Model) -> Result<Notification> {
    let metric = m.metric.parse().map_err(|_| StorageError::Corrupt {
        entity: "notification",
        column: "metric",
        value: m.metric.clone(),
    })?;
    let operator = m.operator.parse().map_err(|_| StorageError::Corrupt {
        entity: "notification",
        column: "operator",
        value: m.operator.clone(),
    })?;
    Ok(Notification {
        id: m.id,
        alert_id: m.alert_id,
        container_id: m.container_id,
        metric,
        value: m.value,
        operator,
        threshold: m.threshold,
        message: m.message,
        at: m.at.with_timezone(&Utc),
    })
}

impl MonitorStore {
    pub async fn insert_notification(&self, n: &Notification) -> Result<Notification> {
        let am = notification::ActiveModel {
            id: Set(n.id.clone()),
            alert_id: Set(n.alert_id.clone()),
            container_id: Set(n.container_id.clone()),
            metric: Set(n.metric.to_string()),
            value: Set(n.value),
            operator: Set(n.operator.to_string()),
            threshold: Set(n.threshold),
            message: Set(n.message.clone()),
            at: Set(n.at.fixed_offset()),
        };
        let model = am.insert(self.db()).await?;
        to_notification(model)
    }

    /// List stored notifications newest first, optionally filtered by
    /// container and/or source alert rule.
    pub async fn list_notifications(
        &self,
        container_id: Option<&str>,
        alert_id: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Notification>> {
        let mut q = Entity::find();
        if let Some(cid) = container_id {
            q = q.filter(Column::ContainerId.eq(cid));
        }
        if let Some(aid) = alert_id {
            q = q.filter(Column::AlertId.eq(aid));
        }
        let rows = q
            .order_by(Column::At, Order::Desc)
            .limit(limit)
            .offset(offset)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_notification).collect()
    }

    pub async fn count_notifications(
        &self,
        container_id: Option<&str>,
        alert_id: Option<&str>,
    ) -> Result<u64> {
        let mut q = Entity::find();
        if let Some(cid) = container_id {
            q = q.filter(Column::ContainerId.eq(cid));
        }
        if let Some(aid) = alert_id {
            q = q.filter(Column::AlertId.eq(aid));
        }
        Ok(q.count(self.db()).await?)
    }
}
