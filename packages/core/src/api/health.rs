use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::monitor::Reading;
use super::ApiState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// `None` until the first reading has been ingested.
    pub last_reading_at: Option<DateTime<Utc>>,
}

/// `GET /health`: liveness plus the age of the latest reading.
pub async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let latest = state.coordinator.read().await.latest_reading();
    let last_reading_at = (latest != Reading::default()).then_some(latest.captured_at);

    (
        [(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))],
        Json(HealthResponse {
            status: "ok",
            last_reading_at,
        }),
    )
}
