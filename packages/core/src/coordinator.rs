//! Monitor coordinator.
//!
//! Owns one [`ChannelMonitor`] and its [`ChannelState`] per configured
//! channel, the latest [`Reading`] and the [`AlertLog`]. The coordinator is
//! shared as [`SharedCoordinator`]; a single write lock around
//! [`MonitorCoordinator::ingest`] makes each update visible to readers all
//! at once.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::alerts::NotificationDispatcher;
use crate::monitor::{
    AlertRecord, Channel, ChannelMonitor, ChannelState, MonitorConfig, Reading, ThresholdError,
};
use crate::store::AlertLog;

pub type SharedCoordinator = Arc<RwLock<MonitorCoordinator>>;

struct ChannelSlot {
    monitor: ChannelMonitor,
    state: ChannelState,
}

pub struct MonitorCoordinator {
    /// Sorted by channel: flame, smoke, soil, light.
    slots: Vec<ChannelSlot>,
    latest: Reading,
    log: AlertLog,
    dispatcher: Option<NotificationDispatcher>,
}

impl MonitorCoordinator {
    /// Build a coordinator from a threshold table, refusing inconsistent
    /// tables.
    pub fn new(config: MonitorConfig, log_capacity: usize) -> Result<Self, ThresholdError> {
        config.validate()?;

        let escalation_delay = config.escalation_delay;
        let mut slots: Vec<ChannelSlot> = config
            .channels
            .into_iter()
            .map(|channel| ChannelSlot {
                monitor: ChannelMonitor::new(channel, escalation_delay),
                state: ChannelState::default(),
            })
            .collect();
        slots.sort_by_key(|slot| slot.monitor.channel());

        Ok(Self {
            slots,
            latest: Reading::default(),
            log: AlertLog::new(log_capacity),
            dispatcher: None,
        })
    }

    pub fn with_dispatcher(mut self, dispatcher: NotificationDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Remove the dispatcher handle so the delivery worker can drain and
    /// exit. Alerts ingested afterwards are only logged.
    pub fn detach_dispatcher(&mut self) -> Option<NotificationDispatcher> {
        self.dispatcher.take()
    }

    /// Evaluate `reading` on every channel, queue and log the emitted
    /// alerts, then publish `reading` as the latest snapshot.
    pub fn ingest(&mut self, reading: Reading) -> Vec<AlertRecord> {
        let now = reading.captured_at;
        let mut emitted = Vec::new();

        for slot in &mut self.slots {
            let value = slot.monitor.channel().value_of(&reading);
            let state = std::mem::take(&mut slot.state);
            let (state, alerts) = slot.monitor.evaluate(state, value, now);
            slot.state = state;
            emitted.extend(alerts);
        }

        for record in &emitted {
            tracing::debug!(
                "{} alert on {} ({}): {}",
                record.severity,
                record.channel,
                record.band,
                record.title
            );
            if let Some(dispatcher) = &self.dispatcher {
                dispatcher.dispatch(record.clone());
            }
            self.log.append(record.clone());
        }

        self.latest = reading;
        emitted
    }

    /// Most recent reading, or `Reading::default()` before the first one.
    pub fn latest_reading(&self) -> Reading {
        self.latest.clone()
    }

    /// Logged alerts, most recent first.
    pub fn recent_alerts(&self) -> Vec<AlertRecord> {
        self.log.snapshot()
    }

    pub fn channel_state(&self, channel: Channel) -> Option<&ChannelState> {
        self.slots
            .iter()
            .find(|slot| slot.monitor.channel() == channel)
            .map(|slot| &slot.state)
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.slots.iter().map(|slot| slot.monitor.channel()).collect()
    }
}
