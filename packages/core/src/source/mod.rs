//! Reading Source Interface
//!
//! Abstraction over wherever sensor records come from: a serial device, a
//! pipe, or a scripted source in tests.

pub mod line;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

use crate::monitor::Reading;
use crate::reading::DecodeError;

pub use line::{DeviceReadingSource, LineReadingSource};

/// Errors from a reading source. None of them are fatal to ingestion.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Transient: retry after the backoff interval.
    #[error("Reading source unavailable: {message}")]
    Unavailable { message: String },

    /// A single bad record: discard it and keep reading.
    #[error("Malformed record {line:?}: {reason}")]
    Malformed { line: String, reason: DecodeError },

    /// End of stream; no more readings will arrive.
    #[error("Reading source closed")]
    Closed,
}

#[async_trait]
pub trait ReadingSource {
    /// Wait for and decode the next reading.
    async fn read_reading(&mut self) -> Result<Reading, SourceError>;

    /// Name of this source for logging.
    fn source_name(&self) -> &str;
}
