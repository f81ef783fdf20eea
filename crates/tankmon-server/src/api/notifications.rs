use crate::api::pagination::PaginationParams;
use crate::api::{error_response, success_paginated_response};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use serde::Deserialize;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tankmon_common::types::Notification;
use tankmon_notify::NotificationHub;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct NotificationListParams {
    /// Filter by container
    #[param(required = false)]
    #[serde(rename = "containerId")]
    container_id: Option<String>,
    /// Filter by source alert rule
    #[param(required = false)]
    #[serde(rename = "alertId")]
    alert_id: Option<String>,
}

/// List stored notifications, newest first.
#[utoipa::path(
    get,
    path = "/v1/notifications",
    tag = "Notifications",
    params(NotificationListParams, PaginationParams),
    responses(
        (status = 200, description = "Notification page", body = Vec<Notification>),
        (status = 500, description = "Storage failure", body = crate::api::ApiError)
    )
)]
async fn list_notifications(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<NotificationListParams>,
    Query(pagination): Query<PaginationParams>,
) -> impl IntoResponse {
    let cid = params.container_id.as_deref();
    let aid = params.alert_id.as_deref();
    let total = match state.store.count_notifications(cid, aid).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count notifications");
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
        .list_notifications(cid, aid, pagination.limit(), pagination.offset())
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
            tracing::error!(error = %e, "Failed to list notifications");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// Hub subscription adapted to a stream; unsubscribes as soon as the SSE
/// connection drops so the hub stops writing to a dead sink.
struct HubEventStream {
    hub: Arc<NotificationHub>,
    id: u64,
    rx: UnboundedReceiverStream<Notification>,
}

impl Stream for HubEventStream {
    type Item = Notification;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx).poll_next(cx)
    }
}

impl Drop for HubEventStream {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
        tracing::debug!(subscriber_id = self.id, "Notification stream client disconnected");
    }
}

/// Live notification stream (Server-Sent Events).
///
/// One JSON notification per `data:` event; keep-alive comments on the
/// configured interval.
#[utoipa::path(
    get,
    path = "/v1/notifications/stream",
    tag = "Notifications",
    responses(
        (status = 200, description = "text/event-stream of fired notifications")
    )
)]
async fn stream_notifications(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let subscription = state.hub.subscribe();
    let (id, rx) = subscription.into_parts();
    tracing::info!(subscriber_id = id, "Notification stream client connected");

    let stream = HubEventStream {
        hub: state.hub.clone(),
        id,
        rx: UnboundedReceiverStream::new(rx),
    }
    .map(|notification| Event::default().json_data(&notification));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(state.config.stream.keep_alive_secs))
            .text("keep-alive"),
    )
}

pub fn notification_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_notifications))
        .routes(routes!(stream_notifications))
}
