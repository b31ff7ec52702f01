//! In-memory alert log.
//!
//! `AlertLog` keeps the most recently issued alerts, newest first. When the
//! log is full the oldest entry is evicted before the new one is inserted
//! (ring-buffer semantics backed by `VecDeque`).
//!
//! The log is owned by the `MonitorCoordinator`, which is shared behind
//! `Arc<RwLock<_>>`; readers only ever receive a cloned snapshot.

use std::collections::VecDeque;

use crate::monitor::AlertRecord;

/// Number of alerts retained for the dashboard.
pub const DEFAULT_CAPACITY: usize = 20;

/// Capacity-bounded log of `AlertRecord` values.
#[derive(Debug)]
pub struct AlertLog {
    entries: VecDeque<AlertRecord>,
    capacity: usize,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert at the front, evicting the oldest entry if the log is full.
    pub fn append(&mut self, record: AlertRecord) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(record);
    }

    /// Copy of the log, most recent first.
    pub fn snapshot(&self) -> Vec<AlertRecord> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
