use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tankmon_alert::AlertEvaluator;
use tankmon_notify::NotificationHub;
use tankmon_storage::MonitorStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MonitorStore>,
    pub evaluator: Arc<AlertEvaluator>,
    pub hub: Arc<NotificationHub>,
    pub start_time: DateTime<Utc>,
    pub config: Arc<ServerConfig>,
}
