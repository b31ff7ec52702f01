use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::monitor::AlertRecord;
use super::ApiState;

/// `GET /notifications`: recent alerts, most recent first.
///
/// The dashboard polls this every few seconds, so it carries an ETag and
/// answers `304 Not Modified` when the log has not changed.
pub async fn recent_notifications(
    State(state): State<ApiState>,
    request_headers: HeaderMap,
) -> Result<Response, AppError> {
    let alerts = state.coordinator.read().await.recent_alerts();
    let body = serde_json::to_vec(&alerts)?;
    let etag = log_etag(&alerts, &body);

    if client_has_current_log(&request_headers, &etag) {
        return Ok(Response::builder()
            .status(StatusCode::NOT_MODIFIED)
            .header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"))
            .header(header::ETAG, etag.as_str())
            .body(Body::empty())
            .expect("304 notifications response should be valid"));
    }

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"))
        .header(header::ETAG, etag.as_str());
    if let Some(newest) = alerts.first() {
        response = response.header(header::LAST_MODIFIED, http_date(newest.emitted_at));
    }

    Ok(response
        .body(Body::from(body))
        .expect("notifications response should be valid"))
}

/// Strong ETag for the serialized log: entry count plus a hash of the body.
fn log_etag(alerts: &[AlertRecord], body: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("\"{}-{:x}\"", alerts.len(), hasher.finish())
}

/// `If-None-Match` uses weak comparison, so `W/"tag"` matches `"tag"`.
fn client_has_current_log(headers: &HeaderMap, etag: &str) -> bool {
    let Some(raw) = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };

    raw.split(',')
        .map(|tag| tag.trim())
        .map(|tag| tag.strip_prefix("W/").unwrap_or(tag))
        .any(|tag| tag == "*" || tag == etag)
}

fn http_date(at: DateTime<Utc>) -> HeaderValue {
    let formatted = at.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
    HeaderValue::from_str(&formatted).expect("HTTP date is always a valid header value")
}
