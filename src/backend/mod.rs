//! Backend module for the serial measurement link
//!
//! All port I/O, the sample cache and the device session live on a
//! dedicated backend thread so the UI stays responsive. The UI talks to it
//! through crossbeam channels only.
//!
//! # Architecture
//!
//! - [`BackendCommand`] - Messages sent from UI to backend (connect, start, save, ...)
//! - [`BackendMessage`] - Messages sent from backend to UI (window, notifications, status)
//! - [`FrontendHandle`] - UI-side handle for sending commands and receiving messages
//! - [`MoniBackend`] - Main backend entry point, run on its own thread
//!
//! # Components
//!
//! - [`codec`] - Frame decoding and probe verification
//! - [`cache`] - Bounded four-channel sample cache
//! - [`session`] - Device session state machine
//! - [`watchdog`] - Port liveness watchdog
//! - [`framer`] - Thread splitting the port byte stream into lines
//! - [`worker`] - Session coordinator loop
//! - [`serial`] / [`mock_port`] - Real and simulated port drivers
//!
//! # Example
//!
//! ```ignore
//! use moni_helper::backend::{serial::SystemPorts, BackendMessage, MoniBackend};
//! use moni_helper::config::AppConfig;
//!
//! let (backend, frontend) = MoniBackend::new(AppConfig::default(), Box::new(SystemPorts::new()));
//! std::thread::spawn(move || backend.run());
//!
//! frontend.connect("MH0001", Some(10_000));
//! frontend.start_monitoring();
//! frontend.request_window();
//!
//! for msg in frontend.drain() {
//!     if let BackendMessage::Window(window) = msg {
//!         // plot window.channels
//!     }
//! }
//! ```

pub mod cache;
pub mod codec;
pub mod framer;
pub mod mock_port;
pub mod port_trait;
pub mod serial;
pub mod session;
pub mod watchdog;
pub mod worker;

pub use cache::{InsertOutcome, SampleCache};
pub use codec::{decode_frame, looks_like_frame, parse_record, Frame, FrameError, PROBE_LEN};
pub use port_trait::{PortDescriptor, PortDriver, SerialLink};
pub use session::{DeviceSession, SessionState};
pub use watchdog::{Liveness, Watchdog};
pub use worker::{IngestOutcome, SessionCoordinator};

use crate::config::AppConfig;
use crate::types::{ChannelWindow, ConnectionStatus, DeviceInfo, Notification, SessionStats};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Message sent from the UI to the backend
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    /// Find the device by name, open its port and reset the cache
    Connect {
        /// USB serial number of the instrument
        device_name: String,
        /// Cache capacity for the new session; the configured default when `None`
        cache_capacity: Option<usize>,
    },
    /// Close the session and clear the cache
    Disconnect,
    /// Start storing frames
    StartMonitoring,
    /// Stop storing frames
    StopMonitoring,
    /// Request the current display window
    RequestWindow,
    /// Set the number of points per channel in the window
    SetWindowSize(usize),
    /// Export the cache as CSV
    SaveToFile(PathBuf),
    /// Clear the cache, keep the session
    DeleteCache,
    /// Request the list of device names
    RefreshDevices,
    /// Request current statistics
    RequestStats,
    /// Shutdown the backend
    Shutdown,
}

/// Message sent from the backend to the UI
#[derive(Debug, Clone, PartialEq)]
pub enum BackendMessage {
    /// One-way user notification
    Notification(Notification),
    /// Device info after a connect or disconnect
    DeviceInfo(DeviceInfo),
    /// Connection status changed
    ConnectionStatus(ConnectionStatus),
    /// Display window (response to RequestWindow)
    Window(ChannelWindow),
    /// Device names (response to RefreshDevices)
    DeviceList(Vec<String>),
    /// Statistics update
    Stats(SessionStats),
    /// Backend is shutting down
    Shutdown,
}

/// UI-side end of the backend channels
pub struct FrontendHandle {
    /// Receiver for backend messages
    pub receiver: Receiver<BackendMessage>,
    /// Sender for commands to the backend
    pub command_sender: Sender<BackendCommand>,
}

impl FrontendHandle {
    /// Try to receive a message without blocking
    pub fn try_recv(&self) -> Option<BackendMessage> {
        self.receiver.try_recv().ok()
    }

    /// Receive all pending messages
    pub fn drain(&self) -> Vec<BackendMessage> {
        self.receiver.try_iter().collect()
    }

    /// Send a command to the backend
    pub fn send_command(&self, cmd: BackendCommand) -> bool {
        self.command_sender.send(cmd).is_ok()
    }

    pub fn connect(&self, device_name: impl Into<String>, cache_capacity: Option<usize>) {
        self.send_command(BackendCommand::Connect {
            device_name: device_name.into(),
            cache_capacity,
        });
    }

    pub fn disconnect(&self) {
        self.send_command(BackendCommand::Disconnect);
    }

    pub fn start_monitoring(&self) {
        self.send_command(BackendCommand::StartMonitoring);
    }

    pub fn stop_monitoring(&self) {
        self.send_command(BackendCommand::StopMonitoring);
    }

    pub fn request_window(&self) {
        self.send_command(BackendCommand::RequestWindow);
    }

    pub fn set_window_size(&self, size: usize) {
        self.send_command(BackendCommand::SetWindowSize(size));
    }

    pub fn save_to_file(&self, path: impl Into<PathBuf>) {
        self.send_command(BackendCommand::SaveToFile(path.into()));
    }

    pub fn delete_cache(&self) {
        self.send_command(BackendCommand::DeleteCache);
    }

    pub fn refresh_devices(&self) {
        self.send_command(BackendCommand::RefreshDevices);
    }

    pub fn request_stats(&self) {
        self.send_command(BackendCommand::RequestStats);
    }

    /// Request shutdown
    pub fn shutdown(&self) {
        self.send_command(BackendCommand::Shutdown);
    }
}

/// The backend that runs in a separate thread
pub struct MoniBackend {
    config: AppConfig,
    driver: Box<dyn PortDriver>,
    command_receiver: Receiver<BackendCommand>,
    message_sender: Sender<BackendMessage>,
    running: Arc<AtomicBool>,
}

impl MoniBackend {
    /// Create a backend with its communication channels
    pub fn new(config: AppConfig, driver: Box<dyn PortDriver>) -> (Self, FrontendHandle) {
        let (cmd_tx, cmd_rx) = bounded(256);
        // Bounded so a stalled UI cannot grow memory; the coordinator drops and counts overflow
        let (msg_tx, msg_rx) = bounded(1_024);

        let backend = Self {
            config,
            driver,
            command_receiver: cmd_rx,
            message_sender: msg_tx,
            running: Arc::new(AtomicBool::new(true)),
        };

        let frontend = FrontendHandle {
            receiver: msg_rx,
            command_sender: cmd_tx,
        };

        (backend, frontend)
    }

    /// Run the backend loop
    pub fn run(self) {
        let mut coordinator = SessionCoordinator::new(
            self.config,
            self.driver,
            self.command_receiver,
            self.message_sender,
            self.running,
        );
        coordinator.run();
    }

    /// Get a handle to stop the backend
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock_port::SimulatedPorts;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    #[test]
    fn test_backend_creation() {
        let (backend, frontend) =
            MoniBackend::new(AppConfig::default(), Box::new(SimulatedPorts::new()));

        assert!(backend.running.load(Ordering::SeqCst));
        assert!(frontend.send_command(BackendCommand::Shutdown));
    }

    #[test]
    fn test_frontend_handle_commands() {
        let (backend, frontend) =
            MoniBackend::new(AppConfig::default(), Box::new(SimulatedPorts::new()));

        frontend.connect("MH0001", None);
        frontend.start_monitoring();
        frontend.set_window_size(100);
        frontend.stop_monitoring();
        frontend.disconnect();

        let commands: Vec<_> = backend.command_receiver.try_iter().collect();
        assert_eq!(
            commands,
            vec![
                BackendCommand::Connect {
                    device_name: "MH0001".to_string(),
                    cache_capacity: None
                },
                BackendCommand::StartMonitoring,
                BackendCommand::SetWindowSize(100),
                BackendCommand::StopMonitoring,
                BackendCommand::Disconnect,
            ]
        );
    }

    #[test]
    fn test_backend_thread_shuts_down() {
        let (backend, frontend) =
            MoniBackend::new(AppConfig::default(), Box::new(SimulatedPorts::new()));
        let thread = std::thread::spawn(move || backend.run());

        frontend.shutdown();
        thread.join().unwrap();

        let last = frontend
            .receiver
            .recv_timeout(Duration::from_secs(1))
            .unwrap();
        assert_eq!(last, BackendMessage::Shutdown);
    }

    #[test]
    fn test_stop_handle_ends_loop() {
        let (backend, _frontend) =
            MoniBackend::new(AppConfig::default(), Box::new(SimulatedPorts::new()));
        let stop = backend.stop_handle();
        let thread = std::thread::spawn(move || backend.run());

        stop.store(false, Ordering::SeqCst);
        thread.join().unwrap();
    }
}
