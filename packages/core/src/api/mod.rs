//! HTTP API.
//!
//! Read-only views of the coordinator for the dashboard, plus health and
//! Prometheus endpoints. Handlers only ever take a read lock, so they
//! always see a fully applied reading.

pub mod data;
pub mod health;
pub mod metrics;
pub mod notifications;

use std::sync::Arc;

use axum::{http::Method, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::coordinator::SharedCoordinator;
use crate::metrics::AppMetrics;

/// Shared state for every route.
#[derive(Clone)]
pub struct ApiState {
    pub coordinator: SharedCoordinator,
    pub metrics: Arc<AppMetrics>,
}

/// Assemble the full router served by the binary.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/data", get(data::latest_data))
        .route("/notifications", get(notifications::recent_notifications))
        .route("/metrics", get(metrics::render_metrics))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        )
        .with_state(state)
}
