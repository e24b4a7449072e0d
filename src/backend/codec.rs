//! Frame codec for the instrument's text protocol
//!
//! The instrument emits one line per sample: four comma-separated numbers
//! terminated by `\n`, e.g. `100,200,300,4000\n`. The line framer hands
//! this module complete lines without the trailing newline.
//!
//! Decoding never fails: unparseable or missing fields become `NaN` and the
//! field count is kept. [`Frame::into_record`] is where a frame is accepted
//! or rejected as malformed.

use crate::types::{SampleRecord, CHANNEL_COUNT};
use thiserror::Error;

/// Size of the identity probe read from a freshly opened port
pub const PROBE_LEN: usize = 17;

/// Offset of the first comma inside a probe
const PROBE_COMMA_OFFSET: usize = 3;

/// Offset of the frame terminator inside a probe
const PROBE_NEWLINE_OFFSET: usize = PROBE_LEN - 1;

/// A decoded but not yet validated line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Parsed values; `NaN` where a field was missing or unparseable
    pub fields: [f64; CHANNEL_COUNT],
    /// Number of comma-separated fields present on the line
    pub field_count: usize,
}

/// Reason a frame could not become a [`SampleRecord`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The line did not have exactly four fields
    #[error("expected {expected} fields, got {0}", expected = CHANNEL_COUNT)]
    FieldCount(usize),
    /// A field was empty, not a number or not finite (0-based index)
    #[error("field {} is not a number", .0 + 1)]
    NotANumber(usize),
}

impl Frame {
    /// Validate the frame and turn it into a record
    pub fn into_record(self) -> Result<SampleRecord, FrameError> {
        if self.field_count != CHANNEL_COUNT {
            return Err(FrameError::FieldCount(self.field_count));
        }
        if let Some(index) = self.fields.iter().position(|v| v.is_nan()) {
            return Err(FrameError::NotANumber(index));
        }
        Ok(SampleRecord::from(self.fields))
    }
}

/// Split a line on commas and parse each field as a number
pub fn decode_frame(line: &str) -> Frame {
    let mut fields = [f64::NAN; CHANNEL_COUNT];
    let mut field_count = 0;

    for (i, raw) in line.trim().split(',').enumerate() {
        field_count += 1;
        if i < CHANNEL_COUNT {
            fields[i] = parse_field(raw);
        }
    }

    Frame {
        fields,
        field_count,
    }
}

/// Decode and validate in one step
pub fn parse_record(line: &str) -> Result<SampleRecord, FrameError> {
    decode_frame(line).into_record()
}

/// `inf`, `nan` and overflowing literals parse as `f64` but are not samples
fn parse_field(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(f64::NAN)
}

/// Check that a probe read from a port has the shape of one frame
///
/// Only the structure is checked: comma at offset 3, newline at offset 16
/// and no control characters before the newline.
pub fn looks_like_frame(probe: &[u8]) -> bool {
    if probe.len() < PROBE_LEN {
        return false;
    }
    if probe[PROBE_COMMA_OFFSET] != b',' || probe[PROBE_NEWLINE_OFFSET] != b'\n' {
        return false;
    }
    !probe[..PROBE_NEWLINE_OFFSET]
        .iter()
        .any(|b| b.is_ascii_control())
}
