use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

use crate::entities::measurement::{self, Column, Entity};
use crate::store::MonitorStore;
use tankmon_common::types::Measurement;

fn to_measurement(m: measurement::Model) -> Measurement {
    Measurement {
        id: m.id,
        container_id: m.container_id,
        container_name: m.container_name,
        temperature: m.temperature,
        ph: m.ph,
        weight: m.weight,
        volume: m.volume,
        density: m.density,
        quality_score: m.quality_score,
        timestamp: m.timestamp.with_timezone(&Utc),
    }
}

impl MonitorStore {
    pub async fn insert_measurement(&self, m: &Measurement) -> Result<Measurement> {
        let am = measurement::ActiveModel {
            id: Set(m.id.clone()),
            container_id: Set(m.container_id.clone()),
            container_name: Set(m.container_name.clone()),
            temperature: Set(m.temperature),
            ph: Set(m.ph),
            weight: Set(m.weight),
            volume: Set(m.volume),
            density: Set(m.density),
            quality_score: Set(m.quality_score),
            timestamp: Set(m.timestamp.fixed_offset()),
        };
        let model = am.insert(self.db()).await?;
        Ok(to_measurement(model))
    }

    /// List measurements newest first, optionally for one container.
    pub async fn list_measurements(
        &self,
        container_id: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Measurement>> {
        let mut q = Entity::find();
        if let Some(cid) = container_id {
            q = q.filter(Column::ContainerId.eq(cid));
        }
        let rows = q
            .order_by(Column::Timestamp, Order::Desc)
            .limit(limit)
            .offset(offset)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_measurement).collect())
    }

    pub async fn count_measurements(&self, container_id: Option<&str>) -> Result<u64> {
        let mut q = Entity::find();
        if let Some(cid) = container_id {
            q = q.filter(Column::ContainerId.eq(cid));
        }
        Ok(q.count(self.db()).await?)
    }

    pub async fn latest_measurement(&self, container_id: Option<&str>) -> Result<Option<Measurement>> {
        let mut q = Entity::find();
        if let Some(cid) = container_id {
            q = q.filter(Column::ContainerId.eq(cid));
        }
        let row = q
            .order_by(Column::Timestamp, Order::Desc)
            .one(self.db())
            .await?;
        Ok(row.map(to_measurement))
    }

    /// Most recent measurement inside `[from, to]`, excluding `exclude_id`
    /// (the measurement currently under evaluation). Backs the engine's
    /// duration-hold check.
    pub async fn latest_in_window(
        &self,
        container_id: Option<&str>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        exclude_id: &str,
    ) -> Result<Option<Measurement>> {
        let mut q = Entity::find()
            .filter(Column::Timestamp.gte(from.fixed_offset()))
            .filter(Column::Timestamp.lte(to.fixed_offset()))
            .filter(Column::Id.ne(exclude_id));
        if let Some(cid) = container_id {
            q = q.filter(Column::ContainerId.eq(cid));
        }
        let row = q
            .order_by(Column::Timestamp, Order::Desc)
            .one(self.db())
            .await?;
        Ok(row.map(to_measurement))
    }
}
