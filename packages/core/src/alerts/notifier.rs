//! Notifier implementations.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

use crate::monitor::Severity;

/// Default Pushbullet pushes endpoint.
pub const PUSHBULLET_API_URL: &str = "https://api.pushbullet.com/v2/pushes";

/// Errors from a single delivery attempt.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Notification rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Delivery timed out after {after_ms}ms")]
    Timeout { after_ms: u128 },
}

/// Something that can put an alert in front of a human.
#[async_trait]
pub trait Notifier {
    async fn deliver(&self, title: &str, body: &str, severity: Severity) -> Result<(), NotifyError>;

    /// Name of this notifier for logging.
    fn notifier_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct PushPayload<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    title: &'a str,
    body: &'a str,
}

/// Delivers alerts as Pushbullet "note" pushes.
#[derive(Clone)]
pub struct PushbulletNotifier {
    api_url: String,
    access_token: String,
    http: Client,
}

impl PushbulletNotifier {
    pub fn new(api_url: String, access_token: String) -> Self {
        Self {
            api_url,
            access_token,
            http: Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for PushbulletNotifier {
    async fn deliver(&self, title: &str, body: &str, _severity: Severity) -> Result<(), NotifyError> {
        let payload = PushPayload {
            kind: "note",
            title,
            body,
        };

        let response = self
            .http
            .post(&self.api_url)
            .header("Access-Token", &self.access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|err| NotifyError::Network {
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    fn notifier_name(&self) -> &str {
        "pushbullet"
    }
}

/// Fallback used when no push credentials are configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, title: &str, body: &str, severity: Severity) -> Result<(), NotifyError> {
        tracing::warn!("[{}] {}: {}", severity.as_str().to_uppercase(), title, body);
        Ok(())
    }

    fn notifier_name(&self) -> &str {
        "log"
    }
}
