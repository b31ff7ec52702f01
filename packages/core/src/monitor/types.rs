//! Core data types shared by the monitor, the coordinator and the API.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One monitored physical quantity.
///
/// The declaration order is the fixed evaluation order used by the
/// coordinator: flame, smoke, soil, light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Flame,
    Smoke,
    Soil,
    Light,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Flame, Channel::Smoke, Channel::Soil, Channel::Light];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Flame => "flame",
            Channel::Smoke => "smoke",
            Channel::Soil => "soil",
            Channel::Light => "light",
        }
    }

    /// Scalar value this channel classifies. Flame presence maps to `1`/`0`.
    pub fn value_of(&self, reading: &Reading) -> i64 {
        match self {
            Channel::Flame => i64::from(reading.flame_active),
            Channel::Smoke => reading.smoke,
            Channel::Soil => reading.soil,
            Channel::Light => reading.light,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable snapshot of every sensor at one ingestion cycle.
///
/// `Reading::default()` is the sentinel served before the first ingestion:
/// all zeros, no flame, captured at the Unix epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub soil: i64,
    pub smoke: i64,
    pub light: i64,
    pub flame_active: bool,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Medium,
    Critical,
    Escalation,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Medium => "medium",
            Severity::Critical => "critical",
            Severity::Escalation => "escalation",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An alert issued by a channel monitor. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub emitted_at: DateTime<Utc>,
    pub channel: Channel,
    pub band: String,
    pub title: String,
    pub body: String,
    pub severity: Severity,
}
