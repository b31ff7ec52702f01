//! Hazard Monitor Module
//!
//! Classifies each sensor channel against its threshold bands and decides
//! when to emit primary and escalation alerts.

pub mod channel;
pub mod thresholds;
pub mod types;


pub use channel::{ChannelMonitor, ChannelState};
pub use thresholds::{AlertTemplate, Band, ChannelConfig, MonitorConfig, ThresholdError, ValueRange};
pub use types::*;
