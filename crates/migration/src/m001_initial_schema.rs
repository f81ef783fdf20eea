use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_initial_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.get_connection().execute_unprepared(UP_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await?;
        Ok(())
    }
}

const UP_SQL: &str = "
CREATE TABLE IF NOT EXISTS measurements (
    id TEXT PRIMARY KEY NOT NULL,
    container_id TEXT NOT NULL,
    container_name TEXT NOT NULL,
    temperature REAL NOT NULL,
    ph REAL NOT NULL,
    weight REAL NOT NULL,
    volume REAL NOT NULL,
    density REAL,
    quality_score REAL,
    timestamp TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_measurements_container_ts ON measurements(container_id, timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_measurements_ts ON measurements(timestamp DESC);

CREATE TABLE IF NOT EXISTS alert_rules (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    container_id TEXT,
    metric TEXT NOT NULL,
    operator TEXT NOT NULL,
    threshold REAL NOT NULL,
    duration_secs INTEGER NOT NULL DEFAULT 0,
    cooldown_secs INTEGER NOT NULL DEFAULT 300,
    status TEXT NOT NULL DEFAULT 'active',
    last_triggered_at TEXT,
    channels TEXT NOT NULL DEFAULT '[\"inapp\"]',
    webhook_url TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_alert_rules_scope ON alert_rules(status, metric, container_id);

CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY NOT NULL,
    alert_id TEXT NOT NULL,
    container_id TEXT,
    metric TEXT NOT NULL,
    value REAL NOT NULL,
    operator TEXT NOT NULL,
    threshold REAL NOT NULL,
    message TEXT NOT NULL,
    at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_notifications_alert_at ON notifications(alert_id, at DESC);
CREATE INDEX IF NOT EXISTS idx_notifications_container_at ON notifications(container_id, at DESC);
";

const DOWN_SQL: &str = "
DROP TABLE IF EXISTS notifications;
DROP TABLE IF EXISTS alert_rules;
DROP TABLE IF EXISTS measurements;
";
