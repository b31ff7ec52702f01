//! Test doubles for [`Notifier`].

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::alerts::notifier::{Notifier, NotifyError};
use crate::monitor::Severity;

/// Records every delivery; optionally fails the first `n` attempts.
#[derive(Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<(String, Severity)>>,
    failures_remaining: AtomicU32,
    attempts: AtomicU32,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_first(failures: u32) -> Self {
        Self {
            failures_remaining: AtomicU32::new(failures),
            ..Self::default()
        }
    }

    pub fn delivered_titles(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|(title, _)| title.clone())
            .collect()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, title: &str, _body: &str, severity: Severity) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(NotifyError::Network {
                message: "connection reset".to_string(),
            });
        }
        self.delivered
            .lock()
            .unwrap()
            .push((title.to_string(), severity));
        Ok(())
    }

    fn notifier_name(&self) -> &str {
        "recording"
    }
}

/// Never completes a delivery.
pub struct HangingNotifier;

#[async_trait]
impl Notifier for HangingNotifier {
    async fn deliver(&self, _title: &str, _body: &str, _severity: Severity) -> Result<(), NotifyError> {
        std::future::pending::<()>().await;
        Ok(())
    }

    fn notifier_name(&self) -> &str {
        "hanging"
    }
}
