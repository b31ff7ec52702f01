//! Per-channel alert state machine.
//!
//! A [`ChannelMonitor`] is pure: it owns only its configuration and turns
//! `(state, value, now)` into a new state plus the alerts to emit. It never
//! performs I/O and never fails.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::monitor::thresholds::{AlertTemplate, Band, ChannelConfig};
use crate::monitor::types::{AlertRecord, Channel};

/// Debounce and escalation bookkeeping for one channel.
///
/// `condition_since` is set only while a hazardous band is active, and
/// `escalated` can only be true while `condition_since` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelState {
    pub active_band: Option<String>,
    /// Last primary alert per band name.
    pub last_alert_at: HashMap<String, DateTime<Utc>>,
    pub condition_since: Option<DateTime<Utc>>,
    pub escalated: bool,
}

#[derive(Debug, Clone)]
pub struct ChannelMonitor {
    config: ChannelConfig,
    escalation_delay: Duration,
}

impl ChannelMonitor {
    pub fn new(config: ChannelConfig, escalation_delay: Duration) -> Self {
        Self {
            config,
            escalation_delay,
        }
    }

    pub fn channel(&self) -> Channel {
        self.config.channel
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Evaluate one value against the band table.
    ///
    /// Emits at most one primary alert (debounced per band) and at most one
    /// escalation alert per continuous occurrence of a hazardous band.
    pub fn evaluate(
        &self,
        mut state: ChannelState,
        value: i64,
        now: DateTime<Utc>,
    ) -> (ChannelState, Vec<AlertRecord>) {
        let mut emitted = Vec::new();
        let band = self.config.classify(value);

        // Leaving or switching bands ends the current occurrence.
        if state.active_band.as_deref() != band.map(|b| b.name.as_str()) {
            state.condition_since = None;
            state.escalated = false;
        }

        if let Some(band) = band {
            let due = state
                .last_alert_at
                .get(&band.name)
                .map_or(true, |last| now - *last > self.config.notif_delay);
            if due {
                emitted.push(self.record(band, &band.alert, value, now));
                state.last_alert_at.insert(band.name.clone(), now);
            }

            if let Some(escalation) = &band.escalation {
                match state.condition_since {
                    None => {
                        state.condition_since = Some(now);
                        state.escalated = false;
                    }
                    Some(since) if !state.escalated && now - since > self.escalation_delay => {
                        emitted.push(self.record(band, escalation, value, now));
                        state.escalated = true;
                    }
                    Some(_) => {}
                }
            }
        }

        state.active_band = band.map(|b| b.name.clone());
        (state, emitted)
    }

    fn record(
        &self,
        band: &Band,
        template: &AlertTemplate,
        value: i64,
        now: DateTime<Utc>,
    ) -> AlertRecord {
        AlertRecord {
            emitted_at: now,
            channel: self.config.channel,
            band: band.name.clone(),
            title: template.title.clone(),
            body: template.render_body(value),
            severity: template.severity,
        }
    }
}
