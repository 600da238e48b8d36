//! HTTP request handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{debug, error};

use crate::browser::RenderSession;
use crate::coordinator::BatchCoordinator;

use super::types::*;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: BatchCoordinator,
    pub session: Arc<dyn RenderSession>,
}

/// Liveness check
pub async fn test() -> impl IntoResponse {
    Json(TestResponse {
        status: "API is working".to_string(),
    })
}

/// Extract meta tags for `{"urls": [...]}`
///
/// Non-string entries and unparsable URLs are dropped silently; only a
/// missing or non-array `urls` field is a client error.
pub async fn scrape(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            debug!("Rejected scrape body: {}", rejection.body_text());
            let status = match rejection.status() {
                StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
                _ => StatusCode::BAD_REQUEST,
            };
            return (status, Json(ErrorResponse::bad_request(rejection.body_text())))
                .into_response();
        }
    };

    let Some(urls) = body.get("urls").and_then(Value::as_array) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request("URLs must be provided as an array")),
        )
            .into_response();
    };

    let raw: Vec<&str> = urls.iter().filter_map(Value::as_str).collect();
    debug!(submitted = urls.len(), strings = raw.len(), "HTTP scrape request");

    match state.coordinator.scrape(raw).await {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(e) => {
            error!("Scrape batch failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal_error(e.to_string())),
            )
                .into_response()
        }
    }
}

/// Browser, cache and queue status
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let version = state.session.version().await;
    let queue = state.coordinator.queue();

    Json(HealthResponse {
        status: if version.is_some() { "ok" } else { "degraded" }.to_string(),
        browser: BrowserHealth {
            connected: version.is_some(),
            version,
        },
        cache: CacheHealth {
            entries: state.coordinator.cache().len(),
        },
        queue: QueueHealth {
            in_flight: queue.in_flight(),
            queued: queue.queued(),
            concurrency: queue.concurrency(),
        },
    })
}
