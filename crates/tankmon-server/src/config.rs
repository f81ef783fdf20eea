use serde::{Deserialize, Serialize};
use tankmon_common::types::{Channel, CompareOp, Metric};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// CORS allowed origins; empty allows every origin (development mode).
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub stream: StreamConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            cors_allowed_origins: Vec::new(),
            database: DatabaseConfig::default(),
            alerts: AlertsConfig::default(),
            stream: StreamConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL, e.g. `sqlite://data/tankmon.db?mode=rwc`.
    #[serde(default = "default_db_url")]
    pub url: String,
    /// Local directory for the SQLite file; created on startup.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// Cooldown applied when a rule is created without one.
    #[serde(default = "default_cooldown_secs")]
    pub default_cooldown_secs: i64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            default_cooldown_secs: default_cooldown_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Interval between SSE keep-alive comments.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

// ---- Rules seed file types (used by the `init-rules` CLI subcommand) ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesSeedFile {
    #[serde(default)]
    pub rules: Vec<SeedAlertRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedAlertRule {
    pub name: String,
    #[serde(default)]
    pub container_id: Option<String>,
    pub metric: Metric,
    pub operator: CompareOp,
    pub threshold: f64,
    #[serde(default, rename = "durationSec")]
    pub duration_secs: i64,
    #[serde(default, rename = "cooldownSec")]
    pub cooldown_secs: Option<i64>,
    #[serde(default)]
    pub channels: Option<Vec<Channel>>,
    #[serde(default)]
    pub webhook_url: Option<String>,
}

fn default_http_port() -> u16 {
    8080
}

fn default_db_url() -> String {
    "sqlite://data/tankmon.db?mode=rwc".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_cooldown_secs() -> i64 {
    300
}

fn default_keep_alive_secs() -> u64 {
    25
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}
