//! Sensor ingestion loop.
//!
//! Drives the main loop: each cycle waits for the next reading from the
//! source and feeds it to the coordinator, so the API layer always serves
//! the latest reading and alert log.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::coordinator::SharedCoordinator;
use crate::metrics::AppMetrics;
use crate::monitor::Reading;
use crate::source::{ReadingSource, SourceError};

/// What a single ingestion cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Reading applied; carries the number of alerts emitted.
    Ingested(usize),
    /// Malformed record dropped.
    Discarded,
    /// Source unavailable; wait before retrying.
    Unavailable,
    /// Source has ended.
    Closed,
}

/// Run the ingestion loop.
///
/// On each cycle:
/// 1. Wait for the next reading from `source`
/// 2. Run `coordinator.ingest()` under one write lock
/// 3. Count the outcome
///
/// Malformed records are skipped immediately; an unavailable source is
/// retried after `retry_interval`. Neither ever ends the loop.
///
/// Runs until the source closes or `shutdown` flips to `true`. Shutdown is
/// only observed while waiting, so a reading that has been read is always
/// evaluated and its alerts dispatched.
pub async fn run_ingestion(
    mut source: Box<dyn ReadingSource + Send>,
    coordinator: SharedCoordinator,
    metrics: Arc<AppMetrics>,
    retry_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(
        "Ingestion started (source: {}, retry: {:?})",
        source.source_name(),
        retry_interval
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        let result = tokio::select! {
            result = source.read_reading() => result,
            _ = shutdown.changed() => {
                tracing::info!("Shutdown signal received. Stopping ingestion.");
                break;
            }
        };

        match ingest_once(result, &coordinator, &metrics).await {
            CycleOutcome::Ingested(_) | CycleOutcome::Discarded => {}
            CycleOutcome::Unavailable => {
                tokio::select! {
                    _ = time::sleep(retry_interval) => {}
                    _ = shutdown.changed() => {
                        tracing::info!("Shutdown signal received. Stopping ingestion.");
                        break;
                    }
                }
            }
            CycleOutcome::Closed => {
                tracing::warn!("Reading source {} closed", source.source_name());
                break;
            }
        }
    }

    tracing::info!("Ingestion stopped cleanly");
}

/// Apply one source result to the coordinator. Extracted for testability.
pub async fn ingest_once(
    result: Result<Reading, SourceError>,
    coordinator: &SharedCoordinator,
    metrics: &AppMetrics,
) -> CycleOutcome {
    match result {
        Ok(reading) => {
            let alerts = coordinator.write().await.ingest(reading);
            metrics.readings_total.inc();
            for alert in &alerts {
                metrics
                    .alerts_emitted_total
                    .with_label_values(&[alert.channel.as_str(), alert.severity.as_str()])
                    .inc();
            }
            if !alerts.is_empty() {
                tracing::info!("{} alert(s) emitted this cycle", alerts.len());
            }
            CycleOutcome::Ingested(alerts.len())
        }
        Err(err @ SourceError::Malformed { .. }) => {
            tracing::warn!("Discarding record: {}", err);
            metrics.readings_discarded_total.inc();
            CycleOutcome::Discarded
        }
        Err(err @ SourceError::Unavailable { .. }) => {
            tracing::error!("Source error, retrying: {}", err);
            metrics.source_unavailable_total.inc();
            CycleOutcome::Unavailable
        }
        Err(SourceError::Closed) => CycleOutcome::Closed,
    }
}
