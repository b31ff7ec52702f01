//! Queued notification delivery.
//!
//! [`NotificationDispatcher::dispatch`] hands an alert to a bounded queue
//! and returns immediately. One worker task drains the queue, retrying each
//! delivery with exponential backoff and a per-attempt timeout. A full queue
//! drops the delivery (the alert is already in the alert log), so a hung
//! notification channel can never block ingestion.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time;

use crate::alerts::notifier::{Notifier, NotifyError};
use crate::metrics::{AppMetrics, OUTCOME_DELIVERED, OUTCOME_DROPPED, OUTCOME_FAILED};
use crate::monitor::AlertRecord;

/// Retry and queueing limits for notification delivery.
#[derive(Debug, Clone)]
pub struct DeliveryPolicy {
    pub queue_capacity: usize,
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub base_backoff: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(10),
            base_backoff: Duration::from_secs(1),
        }
    }
}

/// Cloneable handle feeding the delivery worker.
///
/// The worker exits once every handle has been dropped and the queue is
/// drained.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<AlertRecord>,
    metrics: Arc<AppMetrics>,
}

impl NotificationDispatcher {
    /// Start the delivery worker and return a handle to it.
    pub fn spawn(
        notifier: Arc<dyn Notifier + Send + Sync>,
        policy: DeliveryPolicy,
        metrics: Arc<AppMetrics>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(policy.queue_capacity.max(1));
        tracing::info!(
            "Notification worker started (notifier: {}, queue: {}, attempts: {})",
            notifier.notifier_name(),
            policy.queue_capacity.max(1),
            policy.max_attempts.max(1),
        );
        let worker = tokio::spawn(run_delivery_worker(rx, notifier, policy, metrics.clone()));
        (Self { tx, metrics }, worker)
    }

    /// Queue an alert for delivery without waiting. Returns `false` when the
    /// delivery had to be dropped.
    pub fn dispatch(&self, record: AlertRecord) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => true,
            Err(TrySendError::Full(record)) => {
                tracing::warn!("Notification queue full, dropping delivery of '{}'", record.title);
                self.metrics.record_delivery(OUTCOME_DROPPED);
                false
            }
            Err(TrySendError::Closed(record)) => {
                tracing::error!(
                    "Notification worker is gone, dropping delivery of '{}'",
                    record.title
                );
                self.metrics.record_delivery(OUTCOME_DROPPED);
                false
            }
        }
    }
}

async fn run_delivery_worker(
    mut rx: mpsc::Receiver<AlertRecord>,
    notifier: Arc<dyn Notifier + Send + Sync>,
    policy: DeliveryPolicy,
    metrics: Arc<AppMetrics>,
) {
    while let Some(record) = rx.recv().await {
        match deliver_with_retry(notifier.as_ref(), &record, &policy).await {
            Ok(attempts) => {
                tracing::info!(
                    "[{}] Notification sent via {}: {} (attempt {})",
                    record.severity.as_str().to_uppercase(),
                    notifier.notifier_name(),
                    record.title,
                    attempts,
                );
                metrics.record_delivery(OUTCOME_DELIVERED);
            }
            Err(err) => {
                tracing::error!("Notification '{}' failed: {}", record.title, err);
                metrics.record_delivery(OUTCOME_FAILED);
            }
        }
    }

    tracing::info!("Notification worker stopped");
}

/// Attempt delivery up to `policy.max_attempts` times. Returns the number
/// of attempts used on success, or the last error.
pub async fn deliver_with_retry(
    notifier: &(dyn Notifier + Send + Sync),
    record: &AlertRecord,
    policy: &DeliveryPolicy,
) -> Result<u32, NotifyError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let outcome = time::timeout(
            policy.attempt_timeout,
            notifier.deliver(&record.title, &record.body, record.severity),
        )
        .await;

        let err = match outcome {
            Ok(Ok(())) => return Ok(attempt),
            Ok(Err(err)) => err,
            Err(_) => NotifyError::Timeout {
                after_ms: policy.attempt_timeout.as_millis(),
            },
        };

        if attempt >= max_attempts {
            return Err(err);
        }

        let delay = backoff_delay(policy.base_backoff, attempt);
        tracing::warn!(
            "Delivery attempt {}/{} for '{}' failed: {} (retrying in {:?})",
            attempt,
            max_attempts,
            record.title,
            err,
            delay,
        );
        time::sleep(delay).await;
        attempt += 1;
    }
}

/// `base * 2^(attempt - 1)` plus up to `base / 2` of random jitter.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponential = base.saturating_mul(1u32 << (attempt - 1).min(6));
    let jitter_ms = (base.as_millis() / 2) as u64;
    let jitter = if jitter_ms == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=jitter_ms)
    };
    exponential + Duration::from_millis(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::alerts::mock::{HangingNotifier, RecordingNotifier};
    use crate::monitor::{Channel, Severity};

    fn make_record(title: &str) -> AlertRecord {
        AlertRecord {
            emitted_at: Utc::now(),
            channel: Channel::Smoke,
            band: "contamination".to_string(),
            title: title.to_string(),
            body: "Smoke: 300".to_string(),
            severity: Severity::Critical,
        }
    }

    fn fast_policy() -> DeliveryPolicy {
        DeliveryPolicy {
            queue_capacity: 8,
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(1),
            base_backoff: Duration::from_millis(1),
        }
    }

    fn make_metrics() -> Arc<AppMetrics> {
        Arc::new(AppMetrics::new().unwrap())
    }

    // ---- deliver_with_retry ----

    #[tokio::test]
    async fn first_attempt_success_uses_one_attempt() {
        let notifier = RecordingNotifier::new();
        let attempts = deliver_with_retry(&notifier, &make_record("a"), &fast_policy())
            .await
            .unwrap();
        assert_eq!(attempts, 1);
        assert_eq!(notifier.delivered_titles(), vec!["a"]);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let notifier = RecordingNotifier::failing_first(2);
        let attempts = deliver_with_retry(&notifier, &make_record("a"), &fast_policy())
            .await
            .unwrap();
        assert_eq!(attempts, 3);
        assert_eq!(notifier.delivered_titles(), vec!["a"]);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let notifier = RecordingNotifier::failing_first(10);
        let err = deliver_with_retry(&notifier, &make_record("a"), &fast_policy())
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Network { .. }));
        assert_eq!(notifier.attempts(), 3);
        assert!(notifier.delivered_titles().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hung_delivery_times_out() {
        let policy = DeliveryPolicy {
            max_attempts: 2,
            ..fast_policy()
        };
        let err = deliver_with_retry(&HangingNotifier, &make_record("a"), &policy)
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Timeout { after_ms: 1000 }));
    }

    #[test]
    fn backoff_grows_exponentially() {
        let base = Duration::from_millis(100);
        let first = backoff_delay(base, 1);
        let third = backoff_delay(base, 3);
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(150));
        assert!(third >= Duration::from_millis(400) && third <= Duration::from_millis(450));
    }

    #[test]
    fn zero_base_backoff_has_no_jitter() {
        assert_eq!(backoff_delay(Duration::ZERO, 4), Duration::ZERO);
    }

    // ---- dispatcher ----

    #[tokio::test]
    async fn worker_delivers_queued_alerts_then_stops() {
        let notifier = Arc::new(RecordingNotifier::new());
        let metrics = make_metrics();
        let (dispatcher, worker) =
            NotificationDispatcher::spawn(notifier.clone(), fast_policy(), metrics.clone());

        assert!(dispatcher.dispatch(make_record("first")));
        assert!(dispatcher.dispatch(make_record("second")));
        drop(dispatcher);
        worker.await.unwrap();

        assert_eq!(notifier.delivered_titles(), vec!["first", "second"]);
        assert!((metrics.delivery_count(OUTCOME_DELIVERED) - 2.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn failed_delivery_does_not_stop_worker() {
        let notifier = Arc::new(RecordingNotifier::failing_first(3));
        let metrics = make_metrics();
        let (dispatcher, worker) =
            NotificationDispatcher::spawn(notifier.clone(), fast_policy(), metrics.clone());

        dispatcher.dispatch(make_record("lost"));
        dispatcher.dispatch(make_record("kept"));
        drop(dispatcher);
        worker.await.unwrap();

        assert_eq!(notifier.delivered_titles(), vec!["kept"]);
        assert!((metrics.delivery_count(OUTCOME_FAILED) - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_drops_without_blocking() {
        let metrics = make_metrics();
        let policy = DeliveryPolicy {
            queue_capacity: 1,
            ..fast_policy()
        };
        let (dispatcher, _worker) =
            NotificationDispatcher::spawn(Arc::new(HangingNotifier), policy, metrics.clone());

        // Nothing yields between the two calls, so the worker cannot drain
        // the single slot in between.
        assert!(dispatcher.dispatch(make_record("1")));
        assert!(!dispatcher.dispatch(make_record("2")));
        assert!((metrics.delivery_count(OUTCOME_DROPPED) - 1.0).abs() < f64::EPSILON);
    }
}
