use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::Response,
};

use crate::error::AppError;
use super::ApiState;

/// `GET /metrics`: Prometheus text exposition.
pub async fn render_metrics(State(state): State<ApiState>) -> Result<Response, AppError> {
    let body = state.metrics.render()?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
        .body(Body::from(body))
        .expect("metrics response should be valid"))
}
