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
pub struct DataResponse {
    #[serde(flatten)]
    pub reading: Reading,
    pub server_time: DateTime<Utc>,
}

/// `GET /data`: latest reading plus server time. Serves the zero reading
/// before the first ingestion.
pub async fn latest_data(State(state): State<ApiState>) -> impl IntoResponse {
    let reading = state.coordinator.read().await.latest_reading();

    (
        [(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))],
        Json(DataResponse {
            reading,
            server_time: Utc::now(),
        }),
    )
}
