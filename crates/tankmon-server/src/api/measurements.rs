use crate::api::pagination::PaginationParams;
use crate::api::{error_response, success_paginated_response, success_response};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tankmon_common::{derive, id};
use tankmon_common::types::{Measurement, Notification};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct CreateMeasurementRequest {
    container_id: String,
    container_name: String,
    temperature: f64,
    #[serde(rename = "pH")]
    ph: f64,
    weight: f64,
    volume: f64,
}

impl CreateMeasurementRequest {
    /// Sensor plausibility checks, applied before anything is stored.
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.container_id.trim().is_empty() {
            errors.push("containerId must not be empty".to_string());
        }
        if !self.temperature.is_finite() || !(0.0..=50.0).contains(&self.temperature) {
            errors.push("temperature must be a number between 0 and 50".to_string());
        }
        if !self.ph.is_finite() || !(0.0..=14.0).contains(&self.ph) {
            errors.push("pH must be a number between 0 and 14".to_string());
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            errors.push("weight must be a positive number".to_string());
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            errors.push("volume must be a positive number".to_string());
        }
        errors
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct MeasurementCreated {
    measurement: Measurement,
    /// Notifications fired while evaluating this measurement.
    alerts_triggered: Vec<Notification>,
}

/// Ingest one measurement: derive density and quality score, persist, then
/// evaluate alert rules.
#[utoipa::path(
    post,
    path = "/v1/measurements",
    tag = "Measurements",
    request_body = CreateMeasurementRequest,
    responses(
        (status = 201, description = "Measurement stored, alerts evaluated", body = MeasurementCreated),
        (status = 400, description = "Invalid sensor values", body = crate::api::ApiError),
        (status = 500, description = "Storage failure", body = crate::api::ApiError)
    )
)]
async fn create_measurement(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateMeasurementRequest>,
) -> impl IntoResponse {
    let errors = req.validate();
    if !errors.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            &errors.join("; "),
        );
    }

    let density = derive::density(req.weight, req.volume);
    if let Some(d) = density {
        if !(derive::DENSITY_PLAUSIBLE_MIN..=derive::DENSITY_PLAUSIBLE_MAX).contains(&d) {
            tracing::warn!(
                container_id = %req.container_id,
                density = d,
                "Calculated density is outside the normal milk range"
            );
        }
    }
    let quality_score = derive::quality_score(req.temperature, req.ph, density);

    let measurement = Measurement {
        id: id::next_id(),
        container_id: req.container_id,
        container_name: req.container_name,
        temperature: req.temperature,
        ph: req.ph,
        weight: req.weight,
        volume: req.volume,
        density,
        quality_score: Some(quality_score),
        timestamp: Utc::now(),
    };

    let stored = match state.store.insert_measurement(&measurement).await {
        Ok(m) => m,
        Err(e) => {
            tracing::error!(error = %e, "Failed to store measurement");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to store measurement",
            );
        }
    };

    // Candidate-query failure aborts evaluation; the measurement stays stored.
    let alerts_triggered = match state.evaluator.evaluate(&stored).await {
        Ok(fired) => fired,
        Err(e) => {
            tracing::error!(error = %e, "Alert evaluation failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Measurement stored but alert evaluation failed",
            );
        }
    };

    success_response(
        StatusCode::CREATED,
        &trace_id,
        MeasurementCreated {
            measurement: stored,
            alerts_triggered,
        },
    )
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct MeasurementListParams {
    /// Filter by container
    #[param(required = false)]
    #[serde(rename = "containerId")]
    container_id: Option<String>,
}

/// List measurements, newest first.
#[utoipa::path(
    get,
    path = "/v1/measurements",
    tag = "Measurements",
    params(MeasurementListParams, PaginationParams),
    responses(
        (status = 200, description = "Measurement page", body = Vec<Measurement>),
        (status = 500, description = "Storage failure", body = crate::api::ApiError)
    )
)]
async fn list_measurements(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<MeasurementListParams>,
    Query(pagination): Query<PaginationParams>,
) -> impl IntoResponse {
    let cid = params.container_id.as_deref();
    let total = match state.store.count_measurements(cid).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count measurements");
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
        .list_measurements(cid, pagination.limit(), pagination.offset())
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
            tracing::error!(error = %e, "Failed to list measurements");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// Latest measurement, optionally for one container.
#[utoipa::path(
    get,
    path = "/v1/measurements/latest",
    tag = "Measurements",
    params(MeasurementListParams),
    responses(
        (status = 200, description = "Latest measurement", body = Measurement),
        (status = 404, description = "No measurements stored", body = crate::api::ApiError)
    )
)]
async fn latest_measurement(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<MeasurementListParams>,
) -> impl IntoResponse {
    let cid = params.container_id.as_deref();
    match state.store.latest_measurement(cid).await {
        Ok(Some(m)) => success_response(StatusCode::OK, &trace_id, m),
        Ok(None) => {
            let msg = match cid {
                Some(cid) => format!("No measurements found for container: {cid}"),
                None => "No measurements found".to_string(),
            };
            error_response(StatusCode::NOT_FOUND, &trace_id, "not_found", &msg)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch latest measurement");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

pub fn measurement_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(create_measurement, list_measurements))
        .routes(routes!(latest_measurement))
}
