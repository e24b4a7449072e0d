//! Configuration module for MoniHelper
//!
//! This module handles application configuration including:
//! - Backend configuration (serial link, cache, watchdog, UI polling)
//! - Application state persistence (last device, cache size, window size)
//!
//! # App Data Location
//!
//! Application data is stored in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.voemp.moni-helper/`
//! - **macOS**: `~/Library/Application Support/dev.voemp.moni-helper/`
//! - **Windows**: `%APPDATA%\dev.voemp.moni-helper\`
//!
//! # Files
//!
//! - `config.toml` - Backend configuration ([`AppConfig`])
//! - `app_state.json` - UI preferences remembered across launches ([`AppState`])
//! - `logs/` - Daily rolling log files

use crate::error::{MoniError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for data directories
pub const APP_ID: &str = "dev.voemp.moni-helper";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// App state filename
pub const APP_STATE_FILE: &str = "app_state.json";

/// Log directory name inside the app data directory
pub const LOG_DIR: &str = "logs";

/// Default serial baud rate of the instrument
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default number of samples the cache may hold
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Largest cache capacity the user may configure
pub const MAX_CACHE_CAPACITY: usize = 50_000;

/// Default number of points per channel in the display window
pub const DEFAULT_WINDOW_SIZE: usize = 500;

/// Smallest display window
pub const MIN_WINDOW_SIZE: usize = 10;

/// Largest display window
pub const MAX_WINDOW_SIZE: usize = 2_000;

/// Default watchdog interval in milliseconds
pub const DEFAULT_WATCHDOG_INTERVAL_MS: u64 = 1_000;

/// Default timeout for the device verification probe in milliseconds
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2_000;

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        MoniError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            MoniError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the config file
pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

/// Get the path to the app state file
pub fn app_state_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(APP_STATE_FILE))
}

/// Clamp a requested cache capacity into the supported range
pub fn clamp_cache_capacity(capacity: usize) -> usize {
    capacity.clamp(1, MAX_CACHE_CAPACITY)
}

/// Clamp a requested window size into the supported range
pub fn clamp_window_size(size: usize) -> usize {
    size.clamp(MIN_WINDOW_SIZE, MAX_WINDOW_SIZE)
}

// ==================== App Config ====================

/// Backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    /// Serial link configuration
    #[serde(default)]
    pub serial: SerialConfig,

    /// Sample cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Liveness watchdog configuration
    #[serde(default)]
    pub watchdog: WatchdogConfig,

    /// UI configuration
    #[serde(default)]
    pub ui: UiConfig,
}

impl AppConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| MoniError::Config(format!("Failed to read {:?}: {}", path, e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| MoniError::Config(format!("Failed to parse {:?}: {}", path, e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration from the default location, returning defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the configuration as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MoniError::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| MoniError::Config(format!("Failed to write config: {}", e)))
    }

    /// Check that all values are usable
    pub fn validate(&self) -> Result<()> {
        if self.serial.baud_rate == 0 {
            return Err(MoniError::Config("Baud rate must be positive".to_string()));
        }
        if self.serial.read_timeout_ms == 0 {
            return Err(MoniError::Config(
                "Serial read timeout must be positive".to_string(),
            ));
        }
        if self.serial.max_frame_len < crate::backend::codec::PROBE_LEN {
            return Err(MoniError::Config(format!(
                "Max frame length must be at least {} bytes",
                crate::backend::codec::PROBE_LEN
            )));
        }
        if self.cache.capacity == 0 || self.cache.capacity > MAX_CACHE_CAPACITY {
            return Err(MoniError::Config(format!(
                "Cache capacity must be within 1..={}",
                MAX_CACHE_CAPACITY
            )));
        }
        if !(MIN_WINDOW_SIZE..=MAX_WINDOW_SIZE).contains(&self.cache.window_size) {
            return Err(MoniError::Config(format!(
                "Window size must be within {}..={}",
                MIN_WINDOW_SIZE, MAX_WINDOW_SIZE
            )));
        }
        if self.watchdog.interval_ms == 0 {
            return Err(MoniError::Config(
                "Watchdog interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// ==================== Serial Config ====================

/// Serial link configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerialConfig {
    /// Baud rate used to open the port
    pub baud_rate: u32,

    /// Read timeout of the framer thread; bounds how long a stop request waits
    pub read_timeout_ms: u64,

    /// Read a 17 byte probe and check the frame shape before committing to a port
    #[serde(default)]
    pub verify_device: bool,

    /// Upper bound for the verification probe read
    pub probe_timeout_ms: u64,

    /// Lines longer than this are dropped by the framer
    pub max_frame_len: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: 100,
            verify_device: false,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            max_frame_len: 256,
        }
    }
}

impl SerialConfig {
    /// Read timeout as a Duration
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Probe timeout as a Duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

// ==================== Cache Config ====================

/// Sample cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Capacity used when a connect request does not specify one
    pub capacity: usize,

    /// Points per channel returned by window requests
    pub window_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

// ==================== Watchdog Config ====================

/// Liveness watchdog configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchdogConfig {
    /// Interval between port enumerations
    pub interval_ms: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_WATCHDOG_INTERVAL_MS,
        }
    }
}

impl WatchdogConfig {
    /// Interval as a Duration
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

// ==================== UI Config ====================

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UiConfig {
    /// How often the UI requests a fresh window while monitoring
    pub poll_interval_ms: u64,

    /// Plot height per channel in points
    pub plot_height: f32,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            plot_height: 160.0,
        }
    }
}

// ==================== App State ====================

/// Persistent application state
///
/// Stores user preferences that persist across launches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppState {
    /// Version for future migration support
    #[serde(default = "default_app_state_version")]
    pub version: u32,

    /// Last device name picked by the user
    #[serde(default)]
    pub last_device_name: Option<String>,

    /// Cache capacity used on the next connect
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Points per channel in the charts
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Dark or light visuals
    #[serde(default = "default_true")]
    pub dark_mode: bool,
}

fn default_app_state_version() -> u32 {
    1
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

fn default_true() -> bool {
    true
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            version: 1,
            last_device_name: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            window_size: DEFAULT_WINDOW_SIZE,
            dark_mode: true,
        }
    }
}

impl AppState {
    /// Load app state from the default location
    pub fn load() -> Result<Self> {
        let path = app_state_path().ok_or_else(|| {
            MoniError::Config("Could not determine app state path".to_string())
        })?;
        Self::load_from(&path)
    }

    /// Load app state from a specific file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| MoniError::Config(format!("Failed to read app state: {}", e)))?;

        let mut state: Self = serde_json::from_str(&content)
            .map_err(|e| MoniError::Config(format!("Failed to parse app state: {}", e)))?;
        state.sanitize();
        Ok(state)
    }

    /// Load app state, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load app state, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save app state to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(&dir.join(APP_STATE_FILE))
    }

    /// Save app state to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| MoniError::Config(format!("Failed to serialize app state: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| MoniError::Config(format!("Failed to write app state: {}", e)))
    }

    /// Clamp hand-edited values back into range
    pub fn sanitize(&mut self) {
        self.cache_capacity = clamp_cache_capacity(self.cache_capacity);
        self.window_size = clamp_window_size(self.window_size);
    }
}

// ==================== Tests ====================
