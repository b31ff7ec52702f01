use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::alerts::notifier::PUSHBULLET_API_URL;
use crate::alerts::DeliveryPolicy;
use crate::cli::Cli;
use crate::monitor::{Channel, MonitorConfig};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("cannot read thresholds file {path}: {message}")]
    ThresholdsFile { path: PathBuf, message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Sensor device path, or `-` for standard input.
    pub device: String,
    pub bind_addr: SocketAddr,
    pub source_retry: Duration,
    pub thresholds_file: Option<PathBuf>,
    pub escalation_delay: Option<Duration>,
    pub notif_delays: Vec<(Channel, Duration)>,
    pub pushbullet: Option<PushbulletConfig>,
    pub delivery: DeliveryPolicy,
}

#[derive(Clone)]
pub struct PushbulletConfig {
    pub api_url: String,
    pub access_token: String,
}

impl fmt::Debug for PushbulletConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushbulletConfig")
            .field("api_url", &self.api_url)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

fn notif_delay_var(channel: Channel) -> &'static str {
    match channel {
        Channel::Flame => "FLAME_NOTIF_DELAY_SECONDS",
        Channel::Smoke => "SMOKE_NOTIF_DELAY_SECONDS",
        Channel::Soil => "SOIL_NOTIF_DELAY_SECONDS",
        Channel::Light => "LIGHT_NOTIF_DELAY_SECONDS",
    }
}

fn parse_seconds(var: &'static str, value: String) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or(ConfigError::Invalid {
            var,
            value,
            reason: "must be a non-negative number of seconds",
        })
}

fn parse_count<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
        var,
        value,
        reason: "must be a positive whole number",
    })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let device = lookup("READING_DEVICE").unwrap_or_else(|| "-".to_string());

        let bind_addr = match lookup("BIND_ADDR") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "BIND_ADDR",
                value,
                reason: "must be a socket address such as 127.0.0.1:5000",
            })?,
            None => SocketAddr::from(([127, 0, 0, 1], 5000)),
        };

        let source_retry = match lookup("SOURCE_RETRY_SECONDS") {
            Some(value) => parse_seconds("SOURCE_RETRY_SECONDS", value)?,
            None => Duration::from_secs(5),
        };

        let escalation_delay = lookup("ESCALATION_DELAY_SECONDS")
            .map(|value| parse_seconds("ESCALATION_DELAY_SECONDS", value))
            .transpose()?;

        let mut notif_delays = Vec::new();
        for channel in Channel::ALL {
            let var = notif_delay_var(channel);
            if let Some(value) = lookup(var) {
                notif_delays.push((channel, parse_seconds(var, value)?));
            }
        }

        let pushbullet = lookup("PUSHBULLET_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .map(|access_token| PushbulletConfig {
                api_url: lookup("PUSHBULLET_API_URL")
                    .unwrap_or_else(|| PUSHBULLET_API_URL.to_string()),
                access_token,
            });

        let mut delivery = DeliveryPolicy::default();
        if let Some(value) = lookup("NOTIFY_MAX_ATTEMPTS") {
            delivery.max_attempts = parse_count("NOTIFY_MAX_ATTEMPTS", value)?;
        }
        if let Some(value) = lookup("NOTIFY_TIMEOUT_SECONDS") {
            delivery.attempt_timeout = parse_seconds("NOTIFY_TIMEOUT_SECONDS", value)?;
        }
        if let Some(value) = lookup("NOTIFY_QUEUE_CAPACITY") {
            delivery.queue_capacity = parse_count("NOTIFY_QUEUE_CAPACITY", value)?;
        }

        Ok(Self {
            device,
            bind_addr,
            source_retry,
            thresholds_file: lookup("THRESHOLDS_FILE").map(PathBuf::from),
            escalation_delay,
            notif_delays,
            pushbullet,
            delivery,
        })
    }

    /// Command-line flags take precedence over the environment.
    pub fn with_cli(mut self, cli: &Cli) -> Self {
        if let Some(device) = &cli.device {
            self.device = device.clone();
        }
        if let Some(bind) = cli.bind {
            self.bind_addr = bind;
        }
        if let Some(path) = &cli.thresholds {
            self.thresholds_file = Some(path.clone());
        }
        if let Some(secs) = cli.escalation_delay {
            self.escalation_delay = Some(Duration::from_secs(secs));
        }
        self
    }

    /// Threshold table to run with: the thresholds file if configured,
    /// otherwise the reference table, with delay overrides applied. The
    /// result is not validated here.
    pub fn monitor_config(&self) -> Result<MonitorConfig, ConfigError> {
        let mut config = match &self.thresholds_file {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|err| {
                    ConfigError::ThresholdsFile {
                        path: path.clone(),
                        message: err.to_string(),
                    }
                })?;
                serde_json::from_str::<MonitorConfig>(&raw).map_err(|err| {
                    ConfigError::ThresholdsFile {
                        path: path.clone(),
                        message: err.to_string(),
                    }
                })?
            }
            None => MonitorConfig::reference(),
        };

        if let Some(delay) = self.escalation_delay {
            config.escalation_delay = to_chrono(delay);
        }
        for (channel, delay) in &self.notif_delays {
            if let Some(channel_config) = config.channel_mut(*channel) {
                channel_config.notif_delay = to_chrono(*delay);
            }
        }

        Ok(config)
    }
}

fn to_chrono(delay: Duration) -> chrono::Duration {
    chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::MAX)
}
