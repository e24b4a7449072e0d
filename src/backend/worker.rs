//! Session coordinator
//!
//! This module contains the loop that runs in the backend thread. It owns
//! the [`SampleCache`] and the [`DeviceSession`] for the lifetime of the
//! process, and is the only code that mutates either of them.
//!
//! # Event sources
//!
//! Three sources are multiplexed with `crossbeam_channel::select!`, each with
//! a single intake function:
//!
//! - **Commands** from the UI ([`BackendCommand`]) - [`SessionCoordinator::handle_command`]
//! - **Link events** from the framer thread - [`SessionCoordinator::handle_link_event`]
//! - **Watchdog ticks** while a session is open - [`SessionCoordinator::on_watchdog_tick`]
//!
//! Events of one source are handled in order; a watchdog tick may land
//! between two frames.
//!
//! # Ingestion
//!
//! Frames are always read from the link. While the session is paused they
//! are counted and discarded. When the cache reports `Full` the session is
//! paused and the UI is told to save and delete the data.

use crate::backend::cache::{InsertOutcome, SampleCache};
use crate::backend::codec::parse_record;
use crate::backend::framer::{LinkEvent, LinkEventKind, LINK_EVENT_CAPACITY};
use crate::backend::port_trait::{device_names, find_device_port, PortDriver};
use crate::backend::session::DeviceSession;
use crate::backend::watchdog::Liveness;
use crate::backend::{BackendCommand, BackendMessage};
use crate::config::{clamp_cache_capacity, clamp_window_size, AppConfig};
use crate::error::{MoniError, Result};
use crate::export::export_csv;
use crate::types::{ChannelWindow, ConnectionStatus, DeviceInfo, Notification, SessionStats};
use crossbeam_channel::{bounded, never, select, Receiver, Sender};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on one loop iteration so the running flag is observed
const IDLE_TIMEOUT: Duration = Duration::from_millis(100);

/// What happened to one frame handed to the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Decoded and offered to the cache
    Inserted(InsertOutcome),
    /// Not four numeric fields; nothing stored
    Malformed,
    /// Session paused or closed; nothing stored
    Discarded,
}

/// Owns the cache and the device session, and reacts to UI commands
pub struct SessionCoordinator {
    config: AppConfig,
    driver: Box<dyn PortDriver>,
    cache: SampleCache,
    session: DeviceSession,
    window_size: usize,
    stats: SessionStats,
    link_rx: Receiver<LinkEvent>,
    command_rx: Receiver<BackendCommand>,
    message_tx: Sender<BackendMessage>,
    running: Arc<AtomicBool>,
    last_status: ConnectionStatus,
}

impl SessionCoordinator {
    /// Create a coordinator with an empty cache and a closed session
    pub fn new(
        config: AppConfig,
        driver: Box<dyn PortDriver>,
        command_rx: Receiver<BackendCommand>,
        message_tx: Sender<BackendMessage>,
        running: Arc<AtomicBool>,
    ) -> Self {
        let (link_tx, link_rx) = bounded(LINK_EVENT_CAPACITY);
        let session = DeviceSession::new(
            config.serial.clone(),
            config.watchdog.interval(),
            link_tx,
        );
        let cache = SampleCache::new(clamp_cache_capacity(config.cache.capacity));
        let window_size = clamp_window_size(config.cache.window_size);

        Self {
            config,
            driver,
            cache,
            session,
            window_size,
            stats: SessionStats::default(),
            link_rx,
            command_rx,
            message_tx,
            running,
            last_status: ConnectionStatus::Disconnected,
        }
    }

    /// Run the main loop until shutdown
    pub fn run(&mut self) {
        tracing::info!("Session coordinator started");

        let command_rx = self.command_rx.clone();
        let link_rx = self.link_rx.clone();

        while self.running.load(Ordering::SeqCst) {
            let ticker = self
                .session
                .watchdog_ticker()
                .cloned()
                .unwrap_or_else(never);

            select! {
                recv(command_rx) -> cmd => match cmd {
                    Ok(cmd) => self.handle_command(cmd),
                    Err(_) => {
                        tracing::info!("Command channel closed");
                        self.running.store(false, Ordering::SeqCst);
                    }
                },
                recv(link_rx) -> event => {
                    if let Ok(event) = event {
                        self.handle_link_event(event);
                    }
                },
                recv(ticker) -> _ => self.on_watchdog_tick(),
                default(IDLE_TIMEOUT) => {}
            }
        }

        if let Err(e) = self.session.close() {
            tracing::warn!("Error closing session at shutdown: {}", e);
        }
        self.try_send_message(BackendMessage::Shutdown);
        tracing::info!("Session coordinator stopped");
    }

    /// Handle a single command
    pub fn handle_command(&mut self, cmd: BackendCommand) {
        match cmd {
            BackendCommand::Connect {
                device_name,
                cache_capacity,
            } => {
                let info = self.connect(&device_name, cache_capacity);
                self.try_send_message(BackendMessage::DeviceInfo(info));
            }
            BackendCommand::Disconnect => self.disconnect(),
            BackendCommand::StartMonitoring => self.start_monitoring(),
            BackendCommand::StopMonitoring => self.stop_monitoring(),
            BackendCommand::RequestWindow => {
                let window = self.window();
                self.try_send_message(BackendMessage::Window(window));
                self.send_stats();
            }
            BackendCommand::SetWindowSize(size) => self.set_window_size(size),
            BackendCommand::SaveToFile(path) => {
                // Outcome is reported through a notification
                let _ = self.save_to_file(&path);
            }
            BackendCommand::DeleteCache => self.delete_cache(),
            BackendCommand::RefreshDevices => {
                if let Ok(names) = self.list_devices() {
                    self.try_send_message(BackendMessage::DeviceList(names));
                }
            }
            BackendCommand::RequestStats => self.send_stats(),
            BackendCommand::Shutdown => {
                self.running.store(false, Ordering::SeqCst);
            }
        }
    }

    // ==================== Commands ====================

    /// Find the port of `device_name`, open it and reset the cache
    ///
    /// Returns the device info after the attempt; `connected` is false when no
    /// port matched, verification failed or the open failed.
    pub fn connect(&mut self, device_name: &str, cache_capacity: Option<usize>) -> DeviceInfo {
        if self.session.is_open() {
            tracing::info!(
                "Connect to {} ignored: already connected to {}",
                device_name,
                self.session.device_info().name
            );
            return self.session.device_info().clone();
        }

        let ports = match self.driver.available_ports() {
            Ok(ports) => ports,
            Err(e) => {
                tracing::error!("Port scan failed: {}", e);
                self.notify(Notification::PortScanFailed);
                return self.session.device_info().clone();
            }
        };

        let Some(port) = find_device_port(&ports, device_name) else {
            tracing::info!("No port found for device {}", device_name);
            return self.session.device_info().clone();
        };
        let port_name = port.port_name.clone();

        match self.session.open(self.driver.as_ref(), device_name, &port_name) {
            Ok(()) => {
                let capacity =
                    clamp_cache_capacity(cache_capacity.unwrap_or(self.config.cache.capacity));
                self.cache.reset_with_capacity(capacity);
                self.stats = SessionStats::default();
                // Frames are read but not stored until monitoring starts
                self.session.pause();
                tracing::info!(
                    "Connected to {} on {} (cache capacity {})",
                    device_name,
                    port_name,
                    capacity
                );
            }
            Err(MoniError::Verification(port)) => {
                tracing::warn!("Port {} is not a {} instrument", port, device_name);
            }
            Err(e) => {
                tracing::error!("Failed to connect to {}: {}", device_name, e);
                self.notify(Notification::PortOpenFailed);
            }
        }

        self.publish_status();
        self.session.device_info().clone()
    }

    /// Close the session and clear the cache
    pub fn disconnect(&mut self) {
        self.cache.clear();
        if let Err(e) = self.session.close() {
            tracing::error!("{}", e);
            self.notify(Notification::PortCloseFailed);
        }
        self.publish_status();
        self.try_send_message(BackendMessage::DeviceInfo(DeviceInfo::default()));
    }

    /// Start storing frames
    pub fn start_monitoring(&mut self) {
        self.session.resume();
        self.publish_status();
    }

    /// Stop storing frames; the device stays connected
    pub fn stop_monitoring(&mut self) {
        self.session.pause();
        self.publish_status();
    }

    /// Current display window
    pub fn window(&self) -> ChannelWindow {
        self.cache.windowed(self.window_size)
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Change the number of points per channel in the window
    pub fn set_window_size(&mut self, size: usize) {
        self.window_size = clamp_window_size(size);
        tracing::debug!("Window size set to {}", self.window_size);
    }

    /// Pause ingestion and write the whole cache as CSV
    ///
    /// The cache is left intact either way so a failed save can be retried.
    pub fn save_to_file(&mut self, path: &Path) -> Result<usize> {
        self.session.pause();
        self.publish_status();

        match export_csv(&self.cache, path) {
            Ok(rows) => {
                tracing::info!("Saved {} rows to {:?}", rows, path);
                self.notify(Notification::SaveFinished);
                Ok(rows)
            }
            Err(e) => {
                tracing::error!("Failed to save to {:?}: {}", path, e);
                self.notify(Notification::SaveFailed);
                Err(e)
            }
        }
    }

    /// Clear the cache without touching the session
    pub fn delete_cache(&mut self) {
        self.cache.clear();
        tracing::info!("Cache cleared");
    }

    /// Serial numbers of all connected USB serial devices
    pub fn list_devices(&mut self) -> Result<Vec<String>> {
        match self.driver.available_ports() {
            Ok(ports) => Ok(device_names(&ports)),
            Err(e) => {
                tracing::error!("Port scan failed: {}", e);
                self.notify(Notification::PortScanFailed);
                Err(e)
            }
        }
    }

    // ==================== Link and Watchdog ====================

    /// Handle one event from the framer thread
    pub fn handle_link_event(&mut self, event: LinkEvent) {
        if !self.session.accepts(&event) {
            tracing::trace!("Ignoring event of stale link {}", event.generation);
            return;
        }
        match event.kind {
            LinkEventKind::Frame(line) => {
                self.ingest_frame(&line);
            }
            LinkEventKind::Closed => self.handle_device_lost("stream closed"),
            LinkEventKind::Failed(reason) => self.handle_device_lost(&reason),
        }
    }

    /// Decode one line and offer it to the cache
    pub fn ingest_frame(&mut self, line: &str) -> IngestOutcome {
        self.stats.frames_received += 1;

        if !self.session.is_open() || self.session.is_paused() {
            self.stats.frames_discarded += 1;
            return IngestOutcome::Discarded;
        }

        let record = match parse_record(line) {
            Ok(record) => record,
            Err(e) => {
                self.stats.frames_malformed += 1;
                tracing::debug!("Malformed frame {:?}: {}", line, e);
                return IngestOutcome::Malformed;
            }
        };

        let outcome = self.cache.push(record);
        match outcome {
            InsertOutcome::Accepted => self.stats.frames_stored += 1,
            InsertOutcome::NearLimit => {
                self.stats.frames_stored += 1;
                tracing::warn!(
                    "Cache at {} of {} samples",
                    self.cache.len(),
                    self.cache.capacity()
                );
                self.notify(Notification::NearCapacity);
            }
            InsertOutcome::Full => {
                tracing::warn!("Cache full, pausing ingestion");
                self.session.pause();
                self.notify(Notification::AtCapacity);
                self.publish_status();
            }
        }
        IngestOutcome::Inserted(outcome)
    }

    /// Run one liveness check of the open session
    pub fn on_watchdog_tick(&mut self) {
        match self.session.check_liveness(self.driver.as_ref()) {
            Liveness::Missing => self.handle_device_lost("port no longer enumerated"),
            Liveness::Present | Liveness::Unknown(_) | Liveness::Inactive => {}
        }
    }

    /// Tear the session down after the device vanished; recorded data is kept
    fn handle_device_lost(&mut self, reason: &str) {
        tracing::warn!(
            "Device {} lost: {}",
            self.session.device_info().name,
            reason
        );
        self.notify(Notification::DeviceDisconnected);
        if let Err(e) = self.session.close() {
            tracing::debug!("Close after device loss: {}", e);
        }
        self.publish_status();
        self.try_send_message(BackendMessage::DeviceInfo(DeviceInfo::default()));
    }

    // ==================== Queries ====================

    pub fn connection_status(&self) -> ConnectionStatus {
        if !self.session.is_open() {
            ConnectionStatus::Disconnected
        } else if self.session.is_paused() {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Monitoring
        }
    }

    pub fn device_info(&self) -> &DeviceInfo {
        self.session.device_info()
    }

    pub fn cache(&self) -> &SampleCache {
        &self.cache
    }

    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    /// Counters with the current cache fill level
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            cache_len: self.cache.len(),
            cache_capacity: self.cache.capacity(),
            frames_dropped: self.session.dropped_frames(),
            ..self.stats.clone()
        }
    }

    // ==================== Messaging ====================

    fn notify(&mut self, notification: Notification) {
        if notification.is_error() {
            tracing::debug!("Notify: {}", notification);
        }
        self.try_send_message(BackendMessage::Notification(notification));
    }

    fn publish_status(&mut self) {
        let status = self.connection_status();
        if status != self.last_status {
            tracing::debug!("Connection status: {} -> {}", self.last_status, status);
            self.last_status = status;
            self.try_send_message(BackendMessage::ConnectionStatus(status));
        }
    }

    fn send_stats(&mut self) {
        let stats = self.stats();
        self.try_send_message(BackendMessage::Stats(stats));
    }

    /// Try to send a message, tracking dropped messages if queue is full
    fn try_send_message(&mut self, msg: BackendMessage) {
        if self.message_tx.try_send(msg).is_err() {
            self.stats.dropped_messages += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock_port::{SimDevice, SimulatedPorts};
    use crate::backend::port_trait::{MockPortDriver, PortDescriptor};

    const PORT: &str = "/dev/ttySIM1";
    const DEVICE: &str = "MH0001";

    struct Harness {
        coordinator: SessionCoordinator,
        messages: Receiver<BackendMessage>,
        _commands: Sender<BackendCommand>,
        ports: SimulatedPorts,
        device: SimDevice,
    }

    impl Harness {
        fn notifications(&self) -> Vec<Notification> {
            self.messages
                .try_iter()
                .filter_map(|m| match m {
                    BackendMessage::Notification(n) => Some(n),
                    _ => None,
                })
                .collect()
        }

        /// Feed the next framer event into the coordinator
        fn pump_link(&mut self) -> bool {
            match self.coordinator.link_rx.recv_timeout(Duration::from_secs(1)) {
                Ok(event) => {
                    self.coordinator.handle_link_event(event);
                    true
                }
                Err(_) => false,
            }
        }
    }

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.serial.read_timeout_ms = 10;
        config.watchdog.interval_ms = 20;
        config.cache.capacity = 10;
        config
    }

    fn harness_with(driver: Box<dyn PortDriver>, ports: SimulatedPorts, device: SimDevice) -> Harness {
        let (cmd_tx, cmd_rx) = bounded(16);
        let (msg_tx, msg_rx) = bounded(256);
        let running = Arc::new(AtomicBool::new(true));
        let coordinator = SessionCoordinator::new(test_config(), driver, cmd_rx, msg_tx, running);
        Harness {
            coordinator,
            messages: msg_rx,
            _commands: cmd_tx,
            ports,
            device,
        }
    }

    fn harness() -> Harness {
        let ports = SimulatedPorts::new();
        let device = ports.add_device(PORT, DEVICE);
        harness_with(Box::new(ports.clone()), ports, device)
    }

    fn connected_harness() -> Harness {
        let mut h = harness();
        let info = h.coordinator.connect(DEVICE, None);
        assert!(info.connected);
        h.coordinator.start_monitoring();
        h.notifications();
        h
    }

    #[test]
    fn test_new_coordinator_is_idle() {
        let h = harness();
        assert_eq!(h.coordinator.connection_status(), ConnectionStatus::Disconnected);
        assert!(h.coordinator.cache().is_empty());
        assert_eq!(h.coordinator.window_size(), 500);
        assert_eq!(h.coordinator.window().len(), 500);
    }

    #[test]
    fn test_connect_matches_serial_number() {
        let mut h = harness();
        let info = h.coordinator.connect(DEVICE, Some(20));
        assert_eq!(info, DeviceInfo::connected(DEVICE, PORT));
        assert_eq!(h.coordinator.connection_status(), ConnectionStatus::Connected);
        assert_eq!(h.coordinator.cache().capacity(), 20);
        assert!(h.ports.is_port_open(PORT));
    }

    #[test]
    fn test_connect_unknown_device() {
        let mut h = harness();
        let info = h.coordinator.connect("MH9999", None);
        assert!(!info.connected);
        assert!(h.notifications().is_empty());
        assert_eq!(h.coordinator.connection_status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_connect_scan_failure() {
        let mut h = harness();
        h.ports.set_fail_scan(true);
        let info = h.coordinator.connect(DEVICE, None);
        assert!(!info.connected);
        assert_eq!(h.notifications(), vec![Notification::PortScanFailed]);
    }

    #[test]
    fn test_connect_open_failure() {
        let mut h = harness();
        h.ports.set_fail_open(true);
        let info = h.coordinator.connect(DEVICE, None);
        assert!(!info.connected);
        assert_eq!(h.notifications(), vec![Notification::PortOpenFailed]);
        assert!(!h.coordinator.session().has_watchdog());
    }

    #[test]
    fn test_connect_while_open_keeps_capacity() {
        let mut h = connected_harness();
        let info = h.coordinator.connect(DEVICE, Some(999));
        assert!(info.connected);
        assert_eq!(h.coordinator.cache().capacity(), 10);
        assert_eq!(h.ports.open_count(), 1);
    }

    #[test]
    fn test_connect_with_mocked_driver() {
        let mut driver = MockPortDriver::new();
        driver
            .expect_available_ports()
            .returning(|| Ok(vec![PortDescriptor::usb("COM7", "OTHER")]));
        driver.expect_open().times(0);

        let ports = SimulatedPorts::new();
        let device = ports.add_device(PORT, DEVICE);
        let mut h = harness_with(Box::new(driver), ports, device);
        assert!(!h.coordinator.connect(DEVICE, None).connected);
    }

    #[test]
    fn test_frames_discarded_until_monitoring() {
        let mut h = harness();
        h.coordinator.connect(DEVICE, None);
        assert_eq!(
            h.coordinator.ingest_frame("1,2,3,4"),
            IngestOutcome::Discarded
        );
        assert!(h.coordinator.cache().is_empty());

        h.coordinator.start_monitoring();
        assert_eq!(
            h.coordinator.ingest_frame("1,2,3,4"),
            IngestOutcome::Inserted(InsertOutcome::Accepted)
        );
        assert_eq!(h.coordinator.cache().len(), 1);

        h.coordinator.stop_monitoring();
        h.coordinator.ingest_frame("5,6,7,8");
        assert_eq!(h.coordinator.cache().len(), 1);
        assert_eq!(h.coordinator.stats().frames_discarded, 2);
    }

    #[test]
    fn test_malformed_frames_are_not_stored() {
        let mut h = connected_harness();
        assert_eq!(h.coordinator.ingest_frame("1,2"), IngestOutcome::Malformed);
        assert_eq!(h.coordinator.ingest_frame("1,x,3,4"), IngestOutcome::Malformed);
        assert!(h.coordinator.cache().is_empty());
        assert_eq!(h.coordinator.stats().frames_malformed, 2);
    }

    #[test]
    fn test_capacity_notifications() {
        let mut h = connected_harness();
        for i in 0..10 {
            h.coordinator.ingest_frame(&format!("{},0,0,0", i));
        }
        assert_eq!(h.notifications(), vec![Notification::NearCapacity]);

        assert_eq!(
            h.coordinator.ingest_frame("10,0,0,0"),
            IngestOutcome::Inserted(InsertOutcome::Full)
        );
        assert_eq!(h.notifications(), vec![Notification::AtCapacity]);
        assert_eq!(h.coordinator.connection_status(), ConnectionStatus::Connected);
        assert_eq!(h.coordinator.cache().len(), 10);
    }

    #[test]
    fn test_frames_from_link_reach_cache() {
        let mut h = connected_harness();
        h.device.send_line("1,2,3,4");
        h.device.send_line("5,6,7,8");
        assert!(h.pump_link());
        assert!(h.pump_link());

        let window = h.coordinator.window();
        assert_eq!(window.channel(0)[498..], [1.0, 5.0]);
        assert_eq!(window.channel(3)[499], 8.0);
    }

    #[test]
    fn test_disconnect_clears_cache() {
        let mut h = connected_harness();
        h.coordinator.ingest_frame("1,2,3,4");
        h.coordinator.disconnect();
        assert!(h.coordinator.cache().is_empty());
        assert_eq!(h.coordinator.connection_status(), ConnectionStatus::Disconnected);
        assert!(!h.ports.is_port_open(PORT));
    }

    #[test]
    fn test_disconnect_close_failure_notifies() {
        let mut h = connected_harness();
        h.ports.set_fail_close(true);
        h.coordinator.disconnect();
        assert_eq!(h.notifications(), vec![Notification::PortCloseFailed]);
        assert_eq!(h.coordinator.connection_status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_watchdog_detects_unplug_once() {
        let mut h = connected_harness();
        h.coordinator.ingest_frame("1,2,3,4");

        h.coordinator.on_watchdog_tick();
        assert!(h.notifications().is_empty());

        h.device.unplug();
        h.coordinator.on_watchdog_tick();
        assert_eq!(h.notifications(), vec![Notification::DeviceDisconnected]);
        assert_eq!(h.coordinator.connection_status(), ConnectionStatus::Disconnected);
        assert_eq!(h.coordinator.cache().len(), 1);

        h.coordinator.on_watchdog_tick();
        assert!(h.notifications().is_empty());
    }

    #[test]
    fn test_link_failure_counts_as_device_loss() {
        let mut h = connected_harness();
        h.device.break_stream();
        assert!(h.pump_link());
        assert_eq!(h.notifications(), vec![Notification::DeviceDisconnected]);
        assert!(!h.coordinator.session().is_open());
    }

    #[test]
    fn test_save_pauses_and_keeps_cache() {
        let mut h = connected_harness();
        h.coordinator.ingest_frame("1,2,3,4");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saveData.csv");

        assert_eq!(h.coordinator.save_to_file(&path).unwrap(), 1);
        assert_eq!(h.coordinator.connection_status(), ConnectionStatus::Connected);
        assert_eq!(h.coordinator.cache().len(), 1);
        assert_eq!(h.notifications(), vec![Notification::SaveFinished]);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "data1,data2,data3,data4\n1,2,3,4\n"
        );
    }

    #[test]
    fn test_save_failure_notifies() {
        let mut h = connected_harness();
        h.coordinator.ingest_frame("1,2,3,4");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");

        assert!(h.coordinator.save_to_file(&path).is_err());
        assert_eq!(h.notifications(), vec![Notification::SaveFailed]);
        assert_eq!(h.coordinator.cache().len(), 1);
    }

    #[test]
    fn test_delete_cache_keeps_session() {
        let mut h = connected_harness();
        h.coordinator.ingest_frame("1,2,3,4");
        h.coordinator.delete_cache();
        assert!(h.coordinator.cache().is_empty());
        assert_eq!(h.coordinator.connection_status(), ConnectionStatus::Monitoring);
    }

    #[test]
    fn test_window_size_is_clamped() {
        let mut h = harness();
        h.coordinator.set_window_size(5);
        assert_eq!(h.coordinator.window().len(), 10);
        h.coordinator.set_window_size(100_000);
        assert_eq!(h.coordinator.window_size(), 2_000);
    }

    #[test]
    fn test_list_devices() {
        let mut h = harness();
        h.ports.add_device("/dev/ttySIM2", "MH0002");
        h.ports.add_anonymous_port("/dev/ttyS0");
        assert_eq!(h.coordinator.list_devices().unwrap(), vec![DEVICE, "MH0002"]);
    }

    #[test]
    fn test_shutdown_command() {
        let mut h = harness();
        h.coordinator.handle_command(BackendCommand::Shutdown);
        assert!(!h.coordinator.running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_full_queue_counts_dropped_messages() {
        let (_cmd_tx, cmd_rx) = bounded(1);
        let (msg_tx, _msg_rx) = bounded(1);
        let mut coordinator = SessionCoordinator::new(
            test_config(),
            Box::new(SimulatedPorts::new()),
            cmd_rx,
            msg_tx,
            Arc::new(AtomicBool::new(true)),
        );
        coordinator.handle_command(BackendCommand::RequestStats);
        coordinator.handle_command(BackendCommand::RequestStats);
        coordinator.handle_command(BackendCommand::RequestStats);
        assert_eq!(coordinator.stats().dropped_messages, 2);
    }
}
