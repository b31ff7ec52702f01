//! Threshold band tables.
//!
//! Each channel carries an ordered list of bands. Classification is
//! first-match-wins over that order, and [`MonitorConfig::validate`] refuses
//! any table in which two bands of one channel could match the same value,
//! so at most one band is ever active per channel.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::monitor::types::{Channel, Severity};

/// Errors found while validating a threshold table.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ThresholdError {
    #[error("Channel {channel} is configured more than once")]
    DuplicateChannel { channel: Channel },

    #[error("Channel {channel} has no bands")]
    NoBands { channel: Channel },

    #[error("Channel {channel} declares band '{band}' more than once")]
    DuplicateBand { channel: Channel, band: String },

    #[error("Band '{band}' on {channel} sets two lower or two upper bounds")]
    ConflictingBounds { channel: Channel, band: String },

    #[error("Band '{band}' on {channel} can never match")]
    EmptyRange { channel: Channel, band: String },

    #[error("Bands '{first}' and '{second}' on {channel} overlap")]
    Overlap {
        channel: Channel,
        first: String,
        second: String,
    },

    #[error("Negative delay configured for {what}")]
    NegativeDelay { what: String },
}

/// Band predicate expressed as optional integer bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_least: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub above: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub below: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_most: Option<i64>,
}

impl ValueRange {
    pub fn below(value: i64) -> Self {
        Self { below: Some(value), ..Self::default() }
    }

    pub fn above(value: i64) -> Self {
        Self { above: Some(value), ..Self::default() }
    }

    pub fn at_most(value: i64) -> Self {
        Self { at_most: Some(value), ..Self::default() }
    }

    pub fn at_least(value: i64) -> Self {
        Self { at_least: Some(value), ..Self::default() }
    }

    /// `low <= value < high`
    pub fn between(low: i64, high: i64) -> Self {
        Self {
            at_least: Some(low),
            below: Some(high),
            ..Self::default()
        }
    }

    pub fn contains(&self, value: i64) -> bool {
        self.at_least.map_or(true, |b| value >= b)
            && self.above.map_or(true, |b| value > b)
            && self.below.map_or(true, |b| value < b)
            && self.at_most.map_or(true, |b| value <= b)
    }

    /// Closed integer interval covered by this range, `None` when empty.
    fn interval(&self) -> Option<(i64, i64)> {
        let low = match (self.at_least, self.above) {
            (Some(b), _) => b,
            (None, Some(b)) => b.checked_add(1)?,
            (None, None) => i64::MIN,
        };
        let high = match (self.at_most, self.below) {
            (Some(b), _) => b,
            (None, Some(b)) => b.checked_sub(1)?,
            (None, None) => i64::MAX,
        };
        (low <= high).then_some((low, high))
    }

    fn has_conflicting_bounds(&self) -> bool {
        (self.at_least.is_some() && self.above.is_some())
            || (self.below.is_some() && self.at_most.is_some())
    }
}

/// Message emitted for a band. `{value}` in `body` is replaced with the
/// channel value at emission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertTemplate {
    pub title: String,
    pub body: String,
    pub severity: Severity,
}

impl AlertTemplate {
    pub fn new(title: impl Into<String>, body: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            severity,
        }
    }

    pub fn render_body(&self, value: i64) -> String {
        self.body.replace("{value}", &value.to_string())
    }
}

/// A named value range. Bands that carry an escalation template are
/// hazardous; bands without one are advisory and never escalate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    pub name: String,
    pub range: ValueRange,
    pub alert: AlertTemplate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation: Option<AlertTemplate>,
}

impl Band {
    pub fn is_hazardous(&self) -> bool {
        self.escalation.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub channel: Channel,
    /// Minimum time between two primary alerts for the same band.
    #[serde(rename = "notif_delay_seconds", with = "seconds")]
    pub notif_delay: Duration,
    pub bands: Vec<Band>,
}

impl ChannelConfig {
    /// First band whose range contains `value`.
    pub fn classify(&self, value: i64) -> Option<&Band> {
        self.bands.iter().find(|band| band.range.contains(value))
    }

    fn validate(&self) -> Result<(), ThresholdError> {
        let channel = self.channel;

        if self.notif_delay < Duration::zero() {
            return Err(ThresholdError::NegativeDelay {
                what: format!("{} notification delay", channel),
            });
        }
        if self.bands.is_empty() {
            return Err(ThresholdError::NoBands { channel });
        }

        let mut intervals: Vec<(&str, (i64, i64))> = Vec::with_capacity(self.bands.len());
        for band in &self.bands {
            if band.range.has_conflicting_bounds() {
                return Err(ThresholdError::ConflictingBounds {
                    channel,
                    band: band.name.clone(),
                });
            }
            if intervals.iter().any(|(name, _)| *name == band.name) {
                return Err(ThresholdError::DuplicateBand {
                    channel,
                    band: band.name.clone(),
                });
            }
            let interval = band.range.interval().ok_or_else(|| ThresholdError::EmptyRange {
                channel,
                band: band.name.clone(),
            })?;
            if let Some((other, _)) = intervals
                .iter()
                .find(|(_, (low, high))| interval.0.max(*low) <= interval.1.min(*high))
            {
                return Err(ThresholdError::Overlap {
                    channel,
                    first: other.to_string(),
                    second: band.name.clone(),
                });
            }
            intervals.push((band.name.as_str(), interval));
        }
        Ok(())
    }
}

/// Full threshold table plus the escalation hold duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub channels: Vec<ChannelConfig>,
    #[serde(rename = "escalation_delay_seconds", with = "seconds")]
    pub escalation_delay: Duration,
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ThresholdError> {
        if self.escalation_delay < Duration::zero() {
            return Err(ThresholdError::NegativeDelay {
                what: "escalation delay".to_string(),
            });
        }
        let mut seen = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            if seen.contains(&channel.channel) {
                return Err(ThresholdError::DuplicateChannel {
                    channel: channel.channel,
                });
            }
            seen.push(channel.channel);
            channel.validate()?;
        }
        Ok(())
    }

    pub fn channel_mut(&mut self, channel: Channel) -> Option<&mut ChannelConfig> {
        self.channels.iter_mut().find(|c| c.channel == channel)
    }

    /// Thresholds the habitat sensors were calibrated against.
    pub fn reference() -> Self {
        Self {
            escalation_delay: Duration::seconds(10),
            channels: vec![
                ChannelConfig {
                    channel: Channel::Flame,
                    notif_delay: Duration::seconds(2),
                    bands: vec![Band {
                        name: "combustion".to_string(),
                        range: ValueRange::at_least(1),
                        alert: AlertTemplate::new(
                            "Combustion event detected",
                            "Active flame detected in Sector Alpha. Trigger fire suppression and evacuate the sector.",
                            Severity::Critical,
                        ),
                        escalation: Some(AlertTemplate::new(
                            "Fire spreading",
                            "Combustion has not been suppressed. Structural integrity is compromised; module jettison is advised.",
                            Severity::Escalation,
                        )),
                    }],
                },
                ChannelConfig {
                    channel: Channel::Smoke,
                    notif_delay: Duration::seconds(2),
                    bands: vec![Band {
                        name: "contamination".to_string(),
                        range: ValueRange::above(200),
                        alert: AlertTemplate::new(
                            "Cabin air contamination",
                            "Volatile gases detected. Possible electrical short or propellant leak; deploy crew masks. (Smoke: {value})",
                            Severity::Critical,
                        ),
                        escalation: Some(AlertTemplate::new(
                            "Atmosphere unrecoverable",
                            "Air quality remains critical. Life support cannot scrub contaminants; seal all hatches.",
                            Severity::Escalation,
                        )),
                    }],
                },
                ChannelConfig {
                    channel: Channel::Soil,
                    notif_delay: Duration::seconds(10),
                    bands: vec![
                        Band {
                            name: "flood".to_string(),
                            range: ValueRange::below(400),
                            alert: AlertTemplate::new(
                                "Fluid leak detected",
                                "High moisture detected. Possible coolant line or water reclamation failure; activate containment. (Soil: {value})",
                                Severity::Critical,
                            ),
                            escalation: Some(AlertTemplate::new(
                                "Catastrophic flooding",
                                "Fluid leak is continuous and containment failure is imminent. Evacuate the sector.",
                                Severity::Escalation,
                            )),
                        },
                        Band {
                            name: "condensation".to_string(),
                            range: ValueRange::between(400, 600),
                            alert: AlertTemplate::new(
                                "Atmospheric condensation",
                                "Humidity rising in Sector Gamma. Potential condensation on critical systems. (Soil: {value})",
                                Severity::Medium,
                            ),
                            escalation: None,
                        },
                    ],
                },
                ChannelConfig {
                    channel: Channel::Light,
                    notif_delay: Duration::seconds(10),
                    bands: vec![
                        Band {
                            name: "extreme_luminosity".to_string(),
                            range: ValueRange::at_most(170),
                            alert: AlertTemplate::new(
                                "Extreme luminosity event",
                                "Light intensity exceeds solar flare predictions. Possible hull breach; avoid visual exposure. (LDR: {value})",
                                Severity::Critical,
                            ),
                            escalation: Some(AlertTemplate::new(
                                "Hull breach confirmed",
                                "Extreme light exposure is sustained. Assume hull integrity is compromised; all crew to safe zones.",
                                Severity::Escalation,
                            )),
                        },
                        Band {
                            name: "low_light".to_string(),
                            range: ValueRange::above(700),
                            alert: AlertTemplate::new(
                                "Orbital shadow or power anomaly",
                                "Module entering orbital shadow. If off-schedule, check the primary power bus. (LDR: {value})",
                                Severity::Info,
                            ),
                            escalation: None,
                        },
                    ],
                },
            ],
        }
    }
}

/// Serde adapter for durations written as (fractional) seconds.
mod seconds {
    use chrono::Duration;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.num_milliseconds() as f64 / 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() {
            return Err(de::Error::custom("duration must be a finite number of seconds"));
        }
        let millis = (secs * 1000.0).round();
        if millis <= i64::MIN as f64 || millis >= i64::MAX as f64 {
            return Err(de::Error::custom(format!("duration of {} seconds is out of range", secs)));
        }
        Duration::try_milliseconds(millis as i64).ok_or_else(|| {
            de::Error::custom(format!("duration of {} seconds is out of range", secs))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(name: &str, range: ValueRange) -> Band {
        Band {
            name: name.to_string(),
            range,
            alert: AlertTemplate::new(name, "value {value}", Severity::Critical),
            escalation: None,
        }
    }

    fn single_channel(bands: Vec<Band>) -> MonitorConfig {
        MonitorConfig {
            escalation_delay: Duration::seconds(10),
            channels: vec![ChannelConfig {
                channel: Channel::Soil,
                notif_delay: Duration::seconds(10),
                bands,
            }],
        }
    }

    // ---- ValueRange ----

    #[test]
    fn between_is_inclusive_low_exclusive_high() {
        let range = ValueRange::between(400, 600);
        assert!(!range.contains(399));
        assert!(range.contains(400));
        assert!(range.contains(599));
        assert!(!range.contains(600));
    }

    #[test]
    fn at_most_and_above_boundaries() {
        assert!(ValueRange::at_most(170).contains(170));
        assert!(!ValueRange::at_most(170).contains(171));
        assert!(!ValueRange::above(700).contains(700));
        assert!(ValueRange::above(700).contains(701));
    }

    #[test]
    fn template_substitutes_value() {
        let template = AlertTemplate::new("t", "Soil: {value}", Severity::Info);
        assert_eq!(template.render_body(350), "Soil: 350");
    }

    // ---- classification ----

    #[test]
    fn reference_soil_boundaries_belong_to_one_band() {
        let config = MonitorConfig::reference();
        let soil = config.channels.iter().find(|c| c.channel == Channel::Soil).unwrap();

        assert_eq!(soil.classify(399).map(|b| b.name.as_str()), Some("flood"));
        assert_eq!(soil.classify(400).map(|b| b.name.as_str()), Some("condensation"));
        assert_eq!(soil.classify(600), None);
    }

    #[test]
    fn reference_light_gap_is_normal() {
        let config = MonitorConfig::reference();
        let light = config.channels.iter().find(|c| c.channel == Channel::Light).unwrap();

        assert!(light.classify(171).is_none());
        assert!(light.classify(700).is_none());
        assert_eq!(light.classify(730).map(|b| b.name.as_str()), Some("low_light"));
    }

    // ---- validation ----

    #[test]
    fn reference_table_is_valid() {
        assert_eq!(MonitorConfig::reference().validate(), Ok(()));
    }

    #[test]
    fn overlapping_bands_are_rejected() {
        let config = single_channel(vec![
            band("flood", ValueRange::below(450)),
            band("condensation", ValueRange::between(400, 600)),
        ]);
        assert_eq!(
            config.validate(),
            Err(ThresholdError::Overlap {
                channel: Channel::Soil,
                first: "flood".to_string(),
                second: "condensation".to_string(),
            })
        );
    }

    #[test]
    fn adjacent_bands_do_not_overlap() {
        let config = single_channel(vec![
            band("flood", ValueRange::below(400)),
            band("condensation", ValueRange::between(400, 600)),
        ]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_range_is_rejected() {
        let config = single_channel(vec![band("never", ValueRange::between(600, 400))]);
        assert!(matches!(config.validate(), Err(ThresholdError::EmptyRange { .. })));
    }

    #[test]
    fn channel_without_bands_is_rejected() {
        let config = single_channel(vec![]);
        assert_eq!(
            config.validate(),
            Err(ThresholdError::NoBands { channel: Channel::Soil })
        );
    }

    #[test]
    fn duplicate_band_names_are_rejected() {
        let config = single_channel(vec![
            band("flood", ValueRange::below(400)),
            band("flood", ValueRange::above(900)),
        ]);
        assert!(matches!(config.validate(), Err(ThresholdError::DuplicateBand { .. })));
    }

    #[test]
    fn conflicting_bounds_are_rejected() {
        let range = ValueRange {
            at_least: Some(1),
            above: Some(1),
            ..ValueRange::default()
        };
        let config = single_channel(vec![band("odd", range)]);
        assert!(matches!(config.validate(), Err(ThresholdError::ConflictingBounds { .. })));
    }

    #[test]
    fn duplicate_channel_is_rejected() {
        let mut config = MonitorConfig::reference();
        let flame = config.channels[0].clone();
        config.channels.push(flame);
        assert_eq!(
            config.validate(),
            Err(ThresholdError::DuplicateChannel { channel: Channel::Flame })
        );
    }

    #[test]
    fn negative_escalation_delay_is_rejected() {
        let mut config = MonitorConfig::reference();
        config.escalation_delay = Duration::seconds(-1);
        assert!(matches!(config.validate(), Err(ThresholdError::NegativeDelay { .. })));
    }

    // ---- serde ----

    #[test]
    fn table_loads_from_json() {
        let json = r#"{
            "escalation_delay_seconds": 30,
            "channels": [{
                "channel": "smoke",
                "notif_delay_seconds": 0.5,
                "bands": [{
                    "name": "contamination",
                    "range": { "above": 200 },
                    "alert": { "title": "Smoke", "body": "{value}", "severity": "critical" },
                    "escalation": { "title": "Smoke!", "body": "still", "severity": "escalation" }
                }]
            }]
        }"#;

        let config: MonitorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.escalation_delay, Duration::seconds(30));
        assert_eq!(config.channels[0].notif_delay, Duration::milliseconds(500));
        assert!(config.channels[0].bands[0].is_hazardous());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn out_of_range_delay_is_a_parse_error() {
        for delay in ["-1e300", "1e300", "-9.3e15"] {
            let json = format!(
                r#"{{"escalation_delay_seconds": {}, "channels": []}}"#,
                delay
            );
            let err = serde_json::from_str::<MonitorConfig>(&json).unwrap_err();
            assert!(err.to_string().contains("out of range"), "{}: {}", delay, err);
        }
    }

    #[test]
    fn negative_delay_parses_then_fails_validation() {
        let json = r#"{"escalation_delay_seconds": -5, "channels": []}"#;
        let config: MonitorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.escalation_delay, Duration::seconds(-5));
        assert!(config.validate().is_err());
    }
}
