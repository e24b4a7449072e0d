//! Action types emitted by the UI panels
//!
//! Panels return `AppAction`s instead of talking to the backend directly;
//! the app handles them in one place.

use std::path::PathBuf;

/// Actions that any panel can emit
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    /// Connect to the device with this name
    Connect {
        device_name: String,
        cache_capacity: usize,
    },
    /// Disconnect and clear the cache
    Disconnect,
    StartMonitoring,
    StopMonitoring,
    /// Ask for a destination and export the cache
    SaveData,
    /// Export the cache to a known path
    SaveDataTo(PathBuf),
    /// Clear the cache
    DeleteCache,
    /// Refresh the device list
    RefreshDevices,
    /// Change the number of points per channel
    SetWindowSize(usize),
    /// Switch between dark and light visuals
    SetDarkMode(bool),
}
