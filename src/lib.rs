//! # MoniHelper: serial measurement monitor
//!
//! A desktop tool that connects to a four-channel measurement instrument over
//! a USB serial port, keeps the incoming samples in a bounded in-memory
//! cache, plots the most recent window live and exports the recording as CSV.
//!
//! ## Architecture
//!
//! - **Backend**: Owns the serial link, sample cache and device session on a
//!   dedicated thread ([`backend::SessionCoordinator`])
//! - **Frontend**: Renders the UI using eframe/egui with egui_plot charts
//! - **Communication**: Crossbeam channels for thread-safe command and message transfer
//!
//! ## Configuration
//!
//! Configuration and UI preferences are stored in the platform-appropriate
//! data directory under `dev.voemp.moni-helper`:
//!
//! - **Linux**: `~/.local/share/dev.voemp.moni-helper/`
//! - **macOS**: `~/Library/Application Support/dev.voemp.moni-helper/`
//! - **Windows**: `%APPDATA%\dev.voemp.moni-helper\`
//!
//! ## Example
//!
//! ```ignore
//! use moni_helper::{
//!     backend::{serial::SystemPorts, MoniBackend},
//!     config::{AppConfig, AppState},
//!     frontend::MoniApp,
//! };
//!
//! fn main() -> eframe::Result<()> {
//!     let config = AppConfig::load_or_default();
//!     let app_state = AppState::load_or_default();
//!
//!     let (backend, frontend) = MoniBackend::new(config.clone(), Box::new(SystemPorts::new()));
//!     std::thread::spawn(move || backend.run());
//!
//!     eframe::run_native(
//!         "MoniHelper",
//!         eframe::NativeOptions::default(),
//!         Box::new(|cc| Ok(Box::new(MoniApp::new(cc, frontend, config, app_state)))),
//!     )
//! }
//! ```

pub mod app;
pub mod backend;
pub mod config;
pub mod error;
pub mod export;
pub mod frontend;
pub mod types;

// Re-export commonly used types
pub use app::MoniApp;
pub use backend::{BackendCommand, BackendMessage, FrontendHandle, MoniBackend, SessionCoordinator};
pub use config::{AppConfig, AppState};
pub use error::{MoniError, Result};
pub use types::{ChannelWindow, ConnectionStatus, DeviceInfo, Notification, SampleRecord, SessionStats};
