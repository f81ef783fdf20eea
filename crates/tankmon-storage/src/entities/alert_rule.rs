use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "alert_rules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub container_id: Option<String>,
    pub metric: String,
    pub operator: String,
    pub threshold: f64,
    pub duration_secs: i64,
    pub cooldown_secs: i64,
    pub status: String,
    pub last_triggered_at: Option<DateTimeWithTimeZone>,
    /// JSON array of channel names.
    pub channels: String,
    pub webhook_url: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
