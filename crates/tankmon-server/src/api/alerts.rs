use crate::api::pagination::PaginationParams;
use crate::api::{error_response, success_paginated_response, success_response};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Deserializer};
use tankmon_common::id;
use tankmon_common::types::{AlertRule, AlertStatus, Channel, CompareOp, Metric};
use tankmon_storage::AlertRuleUpdate;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Rule-shape checks shared by create and update. Enum fields (metric,
/// operator, status, channels) are already rejected by serde before this
/// runs, so only cross-field and value constraints live here.
fn validate_rule_shape(
    name: Option<&str>,
    threshold: Option<f64>,
    duration_secs: Option<i64>,
    cooldown_secs: Option<i64>,
    channels: Option<&[Channel]>,
    webhook_url: Option<&str>,
) -> Vec<String> {
    let mut errors = Vec::new();
    if let Some(name) = name {
        if name.trim().is_empty() {
            errors.push("name must not be empty".to_string());
        }
    }
    if let Some(threshold) = threshold {
        if !threshold.is_finite() {
            errors.push("threshold must be a finite number".to_string());
        }
    }
    if duration_secs.is_some_and(|d| d < 0) {
        errors.push("durationSec must be >= 0".to_string());
    }
    if cooldown_secs.is_some_and(|c| c < 0) {
        errors.push("cooldownSec must be >= 0".to_string());
    }
    if let Some(channels) = channels {
        let wants_webhook = channels.contains(&Channel::Webhook);
        let has_url = webhook_url.is_some_and(|u| !u.trim().is_empty());
        if wants_webhook && !has_url {
            errors.push("webhookUrl is required when channels include webhook".to_string());
        }
    }
    errors
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct CreateAlertRequest {
    name: String,
    #[serde(default)]
    container_id: Option<String>,
    metric: Metric,
    operator: CompareOp,
    threshold: f64,
    #[serde(default, rename = "durationSec")]
    duration_secs: i64,
    #[serde(default, rename = "cooldownSec")]
    cooldown_secs: Option<i64>,
    #[serde(default)]
    channels: Option<Vec<Channel>>,
    #[serde(default)]
    webhook_url: Option<String>,
}

/// Create an alert rule.
#[utoipa::path(
    post,
    path = "/v1/alerts",
    tag = "Alerts",
    request_body = CreateAlertRequest,
    responses(
        (status = 201, description = "Rule created", body = AlertRule),
        (status = 400, description = "Invalid rule definition", body = crate::api::ApiError)
    )
)]
async fn create_alert(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateAlertRequest>,
) -> impl IntoResponse {
    let channels = req.channels.unwrap_or_else(|| vec![Channel::Inapp]);
    let errors = validate_rule_shape(
        Some(req.name.as_str()),
        Some(req.threshold),
        Some(req.duration_secs),
        req.cooldown_secs,
        Some(channels.as_slice()),
        req.webhook_url.as_deref(),
    );
    if !errors.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            &errors.join("; "),
        );
    }

    let now = Utc::now();
    let rule = AlertRule {
        id: id::next_id(),
        name: req.name,
        container_id: req.container_id,
        metric: req.metric,
        operator: req.operator,
        threshold: req.threshold,
        duration_secs: req.duration_secs,
        cooldown_secs: req
            .cooldown_secs
            .unwrap_or(state.config.alerts.default_cooldown_secs),
        status: AlertStatus::Active,
        last_triggered_at: None,
        channels,
        webhook_url: req.webhook_url,
        created_at: now,
        updated_at: now,
    };

    match state.store.insert_alert_rule(&rule).await {
        Ok(stored) => success_response(StatusCode::CREATED, &trace_id, stored),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create alert rule");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct AlertListParams {
    /// Filter by lifecycle status
    #[param(required = false)]
    status: Option<AlertStatus>,
    /// Filter by container scope
    #[param(required = false)]
    #[serde(rename = "containerId")]
    container_id: Option<String>,
}

/// List alert rules, most recently updated first.
#[utoipa::path(
    get,
    path = "/v1/alerts",
    tag = "Alerts",
    params(AlertListParams, PaginationParams),
    responses(
        (status = 200, description = "Alert rule page", body = Vec<AlertRule>),
        (status = 500, description = "Storage failure", body = crate::api::ApiError)
    )
)]
async fn list_alerts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<AlertListParams>,
    Query(pagination): Query<PaginationParams>,
) -> impl IntoResponse {
    let cid = params.container_id.as_deref();
    let total = match state.store.count_alert_rules(params.status, cid).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count alert rules");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };
    match state
        .store
        .list_alert_rules(params.status, cid, pagination.limit(), pagination.offset())
        .await
    {
        Ok(items) => success_paginated_response(
            StatusCode::OK,
            &trace_id,
            items,
            total,
            pagination.limit(),
            pagination.offset(),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list alert rules");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// Get one alert rule.
#[utoipa::path(
    get,
    path = "/v1/alerts/{id}",
    tag = "Alerts",
    params(("id" = String, Path, description = "Rule ID")),
    responses(
        (status = 200, description = "Alert rule", body = AlertRule),
        (status = 404, description = "Rule not found", body = crate::api::ApiError)
    )
)]
async fn get_alert(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_alert_rule(&id).await {
        Ok(Some(rule)) => success_response(StatusCode::OK, &trace_id, rule),
        Ok(None) => error_response(StatusCode::NOT_FOUND, &trace_id, "not_found", "Not found"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to get alert rule");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

// Missing field ⇒ leave untouched; explicit null ⇒ clear.
fn deserialize_clearable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct UpdateAlertRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_clearable")]
    #[schema(value_type = Option<String>)]
    container_id: Option<Option<String>>,
    #[serde(default)]
    metric: Option<Metric>,
    #[serde(default)]
    operator: Option<CompareOp>,
    #[serde(default)]
    threshold: Option<f64>,
    #[serde(default, rename = "durationSec")]
    duration_secs: Option<i64>,
    #[serde(default, rename = "cooldownSec")]
    cooldown_secs: Option<i64>,
    #[serde(default)]
    status: Option<AlertStatus>,
    #[serde(default)]
    channels: Option<Vec<Channel>>,
    #[serde(default, deserialize_with = "deserialize_clearable")]
    #[schema(value_type = Option<String>)]
    webhook_url: Option<Option<String>>,
}

/// Update an alert rule. Omitted fields are left untouched; `containerId`
/// and `webhookUrl` accept an explicit `null` to clear.
#[utoipa::path(
    patch,
    path = "/v1/alerts/{id}",
    tag = "Alerts",
    params(("id" = String, Path, description = "Rule ID")),
    request_body = UpdateAlertRequest,
    responses(
        (status = 200, description = "Updated rule", body = AlertRule),
        (status = 400, description = "Invalid rule definition", body = crate::api::ApiError),
        (status = 404, description = "Rule not found", body = crate::api::ApiError)
    )
)]
async fn update_alert(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateAlertRequest>,
) -> impl IntoResponse {
    // Validate against the merged rule so a webhook channel can't lose its URL.
    let current = match state.store.get_alert_rule(&id).await {
        Ok(Some(rule)) => rule,
        Ok(None) => {
            return error_response(StatusCode::NOT_FOUND, &trace_id, "not_found", "Not found")
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to get alert rule");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };
    let merged_channels = req.channels.clone().unwrap_or(current.channels);
    let merged_webhook = match &req.webhook_url {
        Some(url) => url.clone(),
        None => current.webhook_url,
    };
    let errors = validate_rule_shape(
        req.name.as_deref(),
        req.threshold,
        req.duration_secs,
        req.cooldown_secs,
        Some(merged_channels.as_slice()),
        merged_webhook.as_deref(),
    );
    if !errors.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            &errors.join("; "),
        );
    }

    let update = AlertRuleUpdate {
        name: req.name,
        container_id: req.container_id,
        metric: req.metric,
        operator: req.operator,
        threshold: req.threshold,
        duration_secs: req.duration_secs,
        cooldown_secs: req.cooldown_secs,
        status: req.status,
        channels: req.channels,
        webhook_url: req.webhook_url,
    };
    match state.store.update_alert_rule(&id, &update).await {
        Ok(Some(rule)) => success_response(StatusCode::OK, &trace_id, rule),
        Ok(None) => error_response(StatusCode::NOT_FOUND, &trace_id, "not_found", "Not found"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to update alert rule");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// Delete an alert rule. Stored notifications are kept as history.
#[utoipa::path(
    delete,
    path = "/v1/alerts/{id}",
    tag = "Alerts",
    params(("id" = String, Path, description = "Rule ID")),
    responses(
        (status = 200, description = "Rule deleted"),
        (status = 404, description = "Rule not found", body = crate::api::ApiError)
    )
)]
async fn delete_alert(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_alert_rule(&id).await {
        Ok(true) => success_response(StatusCode::OK, &trace_id, true),
        Ok(false) => error_response(StatusCode::NOT_FOUND, &trace_id, "not_found", "Not found"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to delete alert rule");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// Flip a rule between active and paused.
#[utoipa::path(
    post,
    path = "/v1/alerts/{id}/toggle",
    tag = "Alerts",
    params(("id" = String, Path, description = "Rule ID")),
    responses(
        (status = 200, description = "Toggled rule", body = AlertRule),
        (status = 404, description = "Rule not found", body = crate::api::ApiError)
    )
)]
async fn toggle_alert(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.toggle_alert_rule(&id).await {
        Ok(Some(rule)) => success_response(StatusCode::OK, &trace_id, rule),
        Ok(None) => error_response(StatusCode::NOT_FOUND, &trace_id, "not_found", "Not found"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to toggle alert rule");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

pub fn alert_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(create_alert, list_alerts))
        .routes(routes!(get_alert, update_alert, delete_alert))
        .routes(routes!(toggle_alert))
}
