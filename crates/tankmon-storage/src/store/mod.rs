use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};

pub mod alert;
pub mod measurement;
pub mod notification;

pub use alert::AlertRuleUpdate;

/// Unified access layer for the monitoring database.
///
/// All methods are `async fn` backed by SeaORM over SQLite.
pub struct MonitorStore {
    pub(crate) db: DatabaseConnection,
}

impl MonitorStore {
    /// Connect and initialize the database.
    ///
    /// `db_url` is a full connection URL, e.g. `sqlite:///data/tankmon.db?mode=rwc`.
    /// Pending `sea-orm-migration` migrations run on every connect so the
    /// schema is always current.
    pub async fn new(db_url: &str) -> Result<Self> {
        let db = Database::connect(db_url).await?;

        // WAL mode only applies to SQLite
        if db_url.starts_with("sqlite:") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        }

        Migrator::up(&db, None).await?;

        tracing::info!(db_url = %db_url, "Initialized monitor store");
        Ok(Self { db })
    }

    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}
