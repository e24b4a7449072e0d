//! Core data types for MoniHelper
//!
//! This module contains the plain data structures shared between the
//! backend coordinator and the UI.
//!
//! # Main Types
//!
//! - [`SampleRecord`] - One parsed frame: four channel values
//! - [`DeviceInfo`] - Name, port and connection flag of the current device
//! - [`ChannelWindow`] - Fixed-length, zero-padded display window per channel
//! - [`Notification`] - One-way events pushed to the UI
//! - [`SessionStats`] - Ingestion counters

use serde::{Deserialize, Serialize};

/// Number of channels carried by every frame
pub const CHANNEL_COUNT: usize = 4;

/// Column names of the exported CSV, one per channel
pub const CHANNEL_NAMES: [&str; CHANNEL_COUNT] = ["data1", "data2", "data3", "data4"];

/// One sample across the four channels of the instrument
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SampleRecord {
    pub channels: [f64; CHANNEL_COUNT],
}

impl SampleRecord {
    /// Create a record from four channel values
    pub fn new(c1: f64, c2: f64, c3: f64, c4: f64) -> Self {
        Self {
            channels: [c1, c2, c3, c4],
        }
    }

    /// Value of a single channel (0-based)
    pub fn channel(&self, index: usize) -> Option<f64> {
        self.channels.get(index).copied()
    }
}

impl From<[f64; CHANNEL_COUNT]> for SampleRecord {
    fn from(channels: [f64; CHANNEL_COUNT]) -> Self {
        Self { channels }
    }
}

/// Identity of the device bound to the session
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name as requested by the user (matched against the USB serial number)
    pub name: String,
    /// OS port identifier, e.g. `/dev/ttyUSB0` or `COM3`
    pub port: String,
    /// Whether a session is currently open on `port`
    pub connected: bool,
}

impl DeviceInfo {
    /// Device info for an open session
    pub fn connected(name: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            port: port.into(),
            connected: true,
        }
    }
}

/// Display window: the most recent `len` samples of each channel, left-padded with zeros
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChannelWindow {
    pub channels: [Vec<f64>; CHANNEL_COUNT],
}

impl ChannelWindow {
    /// Window of `len` zeros on every channel
    pub fn zeroed(len: usize) -> Self {
        Self {
            channels: std::array::from_fn(|_| vec![0.0; len]),
        }
    }

    /// Number of points per channel
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    /// Whether the window holds no points
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Points of one channel
    pub fn channel(&self, index: usize) -> &[f64] {
        &self.channels[index]
    }
}

/// Connection status of the device session, as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// No session open
    #[default]
    Disconnected,
    /// Session open, ingestion paused
    Connected,
    /// Session open and frames are being stored
    Monitoring,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::Monitoring => write!(f, "Monitoring"),
        }
    }
}

/// One-way events pushed from the coordinator to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// The cache crossed 80% of its capacity
    NearCapacity,
    /// The cache is full and ingestion was paused
    AtCapacity,
    /// The bound port vanished from the OS port list
    DeviceDisconnected,
    /// Enumerating ports failed
    PortScanFailed,
    /// The matched port could not be opened
    PortOpenFailed,
    /// Closing the port reported an error
    PortCloseFailed,
    /// CSV export completed and was flushed
    SaveFinished,
    /// CSV export failed; the cache was left intact
    SaveFailed,
}

impl Notification {
    /// Whether the UI should present this as an error
    pub fn is_error(&self) -> bool {
        !matches!(self, Notification::NearCapacity | Notification::SaveFinished)
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Notification::NearCapacity => "Cache is above 80% of its capacity",
            Notification::AtCapacity => {
                "Cache is full, monitoring stopped. Save and delete the data to continue"
            }
            Notification::DeviceDisconnected => {
                "Device disconnected unexpectedly. Recorded data can still be saved"
            }
            Notification::PortScanFailed => "Failed to scan serial ports",
            Notification::PortOpenFailed => "Failed to open the serial port",
            Notification::PortCloseFailed => "Failed to close the serial port",
            Notification::SaveFinished => "Data saved",
            Notification::SaveFailed => "Failed to save data",
        };
        write!(f, "{}", text)
    }
}

/// Counters describing the current ingestion session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Frames read from the link since connect
    pub frames_received: u64,
    /// Frames appended to the cache
    pub frames_stored: u64,
    /// Frames rejected by the codec
    pub frames_malformed: u64,
    /// Frames read and dropped while paused
    pub frames_discarded: u64,
    /// Frames dropped because the link event queue was full
    pub frames_dropped: u64,
    /// Messages dropped because the UI queue was full
    pub dropped_messages: u64,
    /// Current cache length
    pub cache_len: usize,
    /// Current cache capacity
    pub cache_capacity: usize,
}

impl SessionStats {
    /// Cache fill level in percent
    pub fn fill_percent(&self) -> f64 {
        if self.cache_capacity == 0 {
            0.0
        } else {
            self.cache_len as f64 * 100.0 / self.cache_capacity as f64
        }
    }
}
