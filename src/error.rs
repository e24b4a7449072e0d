//! Error handling for MoniHelper
//!
//! This module defines the crate error type and a Result alias used
//! throughout the backend. Every failure here is recoverable: the
//! coordinator turns errors into user notifications and falls back to an
//! idle or disconnected state.

use thiserror::Error;

/// Main error type for MoniHelper operations
#[derive(Error, Debug)]
pub enum MoniError {
    /// Errors reported by the serial port library
    #[error("Serial error: {0}")]
    Serial(#[from] serialport::Error),

    /// Enumerating the OS serial ports failed
    #[error("Port scan failed: {0}")]
    PortScan(String),

    /// A port exists but could not be opened
    #[error("Failed to open port {port}: {message}")]
    PortOpen { port: String, message: String },

    /// Closing a port failed (local state is discarded regardless)
    #[error("Failed to close port {port}: {message}")]
    PortClose { port: String, message: String },

    /// The port opened but does not speak the expected frame shape
    #[error("Device on {0} did not answer with a valid frame")]
    Verification(String),

    /// Timeout errors
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors while writing the CSV export
    #[error("Export error: {0}")]
    Export(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<MoniError>,
    },
}

impl MoniError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        MoniError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Strip any context wrappers and return the underlying error
    pub fn root(&self) -> &MoniError {
        match self {
            MoniError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias for MoniHelper operations
pub type Result<T> = std::result::Result<T, MoniError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| MoniError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| MoniError::Io(e).with_context(f()))
    }
}
