use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A sensor metric an alert rule can target.
///
/// Wire names follow the measurement JSON fields (`pH`, `qualityScore`).
/// Density is intentionally absent: it is a derived display field, not an
/// alertable metric.
///
/// # Examples
///
/// ```
/// use tankmon_common::types::Metric;
///
/// let m: Metric = "pH".parse().unwrap();
/// assert_eq!(m, Metric::Ph);
/// assert_eq!(m.to_string(), "pH");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum Metric {
    #[serde(rename = "temperature")]
    Temperature,
    #[serde(rename = "pH")]
    Ph,
    #[serde(rename = "weight")]
    Weight,
    #[serde(rename = "volume")]
    Volume,
    #[serde(rename = "qualityScore")]
    QualityScore,
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Temperature => write!(f, "temperature"),
            Metric::Ph => write!(f, "pH"),
            Metric::Weight => write!(f, "weight"),
            Metric::Volume => write!(f, "volume"),
            Metric::QualityScore => write!(f, "qualityScore"),
        }
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temperature" => Ok(Metric::Temperature),
            "pH" => Ok(Metric::Ph),
            "weight" => Ok(Metric::Weight),
            "volume" => Ok(Metric::Volume),
            "qualityScore" => Ok(Metric::QualityScore),
            _ => Err(format!("unknown metric: {s}")),
        }
    }
}

/// Threshold comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum CompareOp {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
}

impl CompareOp {
    pub fn check(&self, value: f64, threshold: f64) -> bool {
        match self {
            CompareOp::Gt => value > threshold,
            CompareOp::Gte => value >= threshold,
            CompareOp::Lt => value < threshold,
            CompareOp::Lte => value <= threshold,
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Gte => write!(f, ">="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Lte => write!(f, "<="),
        }
    }
}

impl std::str::FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" => Ok(CompareOp::Gt),
            ">=" => Ok(CompareOp::Gte),
            "<" => Ok(CompareOp::Lt),
            "<=" => Ok(CompareOp::Lte),
            _ => Err(format!("unknown compare operator: {s}")),
        }
    }
}

/// Alert rule lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Paused,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Active => write!(f, "active"),
            AlertStatus::Paused => write!(f, "paused"),
        }
    }
}

impl std::str::FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AlertStatus::Active),
            "paused" => Ok(AlertStatus::Paused),
            _ => Err(format!("unknown alert status: {s}")),
        }
    }
}

/// Notification delivery target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Inapp,
    Webhook,
}

/// One persisted sensor reading from a container. Immutable after ingestion;
/// `density` and `quality_score` are derived at ingestion time and may be
/// absent for legacy rows.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub id: String,
    pub container_id: String,
    pub container_name: String,
    pub temperature: f64,
    #[serde(rename = "pH")]
    pub ph: f64,
    pub weight: f64,
    pub volume: f64,
    pub density: Option<f64>,
    pub quality_score: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Measurement {
    /// Read the value backing an alertable metric.
    ///
    /// Returns `None` when the metric has no value on this measurement
    /// (e.g. a missing derived quality score); callers must also reject
    /// non-finite values before comparing.
    pub fn metric_value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Temperature => Some(self.temperature),
            Metric::Ph => Some(self.ph),
            Metric::Weight => Some(self.weight),
            Metric::Volume => Some(self.volume),
            Metric::QualityScore => self.quality_score,
        }
    }
}

/// A user-defined threshold alert rule.
///
/// `container_id == None` scopes the rule to every container; each
/// container's measurements are still evaluated independently.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlertRule {
    pub id: String,
    pub name: String,
    pub container_id: Option<String>,
    pub metric: Metric,
    pub operator: CompareOp,
    pub threshold: f64,
    /// Violation must hold continuously for this long before firing.
    #[serde(rename = "durationSec")]
    pub duration_secs: i64,
    /// Minimum seconds between repeated firings.
    #[serde(rename = "cooldownSec")]
    pub cooldown_secs: i64,
    pub status: AlertStatus,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub channels: Vec<Channel>,
    pub webhook_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AlertRule {
    /// True while the rule is inside its cooldown window relative to `now`.
    pub fn within_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.last_triggered_at
            .is_some_and(|last| now - last < Duration::seconds(self.cooldown_secs))
    }
}

/// A fired-alert record. `value`, `operator` and `threshold` are snapshots
/// taken at fire time; editing the rule afterwards does not rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub alert_id: String,
    pub container_id: Option<String>,
    pub metric: Metric,
    pub value: f64,
    pub operator: CompareOp,
    pub threshold: f64,
    pub message: String,
    pub at: DateTime<Utc>,
}
