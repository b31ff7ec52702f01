//! Decoding of the microcontroller's line protocol.
//!
//! Each line is `soil,smoke,light,flame` as decimal integers. The flame
//! sensor is active-low, so a raw `0` means a flame is present.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::monitor::Reading;

pub const FIELD_COUNT: usize = 4;

/// Longest record accepted, excluding the newline. Four 64-bit integers
/// with separators fit comfortably.
pub const MAX_LINE_BYTES: usize = 128;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("expected 4 fields, found {found}")]
    WrongArity { found: usize },

    #[error("record is not valid UTF-8")]
    InvalidEncoding,

    #[error("record exceeds {limit} bytes without a newline")]
    LineTooLong { limit: usize },

    #[error("field '{field}' is not an integer: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

fn parse_field(field: &'static str, raw: &str) -> Result<i64, DecodeError> {
    raw.trim().parse::<i64>().map_err(|_| DecodeError::InvalidField {
        field,
        value: raw.trim().to_string(),
    })
}

/// Decode one record into a [`Reading`] stamped with `captured_at`.
pub fn decode_line(line: &str, captured_at: DateTime<Utc>) -> Result<Reading, DecodeError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(DecodeError::WrongArity { found: 0 });
    }

    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != FIELD_COUNT {
        return Err(DecodeError::WrongArity {
            found: fields.len(),
        });
    }

    Ok(Reading {
        soil: parse_field("soil", fields[0])?,
        smoke: parse_field("smoke", fields[1])?,
        light: parse_field("light", fields[2])?,
        flame_active: parse_field("flame", fields[3])? == 0,
        captured_at,
    })
}
