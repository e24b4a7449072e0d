//! Mock construction helpers

use super::test_timeout;
use moni_helper::backend::mock_port::{SimDevice, SimulatedPorts};
use moni_helper::backend::{BackendMessage, FrontendHandle, MoniBackend};
use moni_helper::config::AppConfig;
use moni_helper::types::{ChannelWindow, ConnectionStatus, Notification};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

pub const TEST_PORT: &str = "/dev/ttyTEST0";
pub const TEST_DEVICE: &str = "TEST0001";

/// Simulated port list with one plugged instrument
pub fn create_test_ports() -> (SimulatedPorts, SimDevice) {
    let ports = SimulatedPorts::new();
    let device = ports.add_device(TEST_PORT, TEST_DEVICE);
    (ports, device)
}

/// A backend running on its own thread, plus everything it has sent so far
pub struct RunningBackend {
    pub frontend: FrontendHandle,
    pub received: Vec<BackendMessage>,
    handle: Option<JoinHandle<()>>,
}

impl RunningBackend {
    pub fn spawn(config: AppConfig, ports: &SimulatedPorts) -> Self {
        let (backend, frontend) = MoniBackend::new(config, Box::new(ports.clone()));
        let handle = std::thread::spawn(move || backend.run());
        Self {
            frontend,
            received: Vec::new(),
            handle: Some(handle),
        }
    }

    /// Receive messages until one matches `pred`, returning a clone of it
    pub fn wait_for<F>(&mut self, pred: F) -> Option<BackendMessage>
    where
        F: Fn(&BackendMessage) -> bool,
    {
        let deadline = Instant::now() + test_timeout();
        while Instant::now() < deadline {
            if let Ok(msg) = self.frontend.receiver.recv_timeout(Duration::from_millis(10)) {
                let hit = pred(&msg);
                self.received.push(msg.clone());
                if hit {
                    return Some(msg);
                }
            }
        }
        None
    }

    /// Keep receiving for `period` without looking for anything in particular
    pub fn collect_for(&mut self, period: Duration) {
        let deadline = Instant::now() + period;
        while Instant::now() < deadline {
            if let Ok(msg) = self.frontend.receiver.recv_timeout(Duration::from_millis(10)) {
                self.received.push(msg);
            }
        }
    }

    pub fn wait_for_status(&mut self, status: ConnectionStatus) -> bool {
        self.wait_for(|m| *m == BackendMessage::ConnectionStatus(status))
            .is_some()
    }

    pub fn wait_for_notification(&mut self, notification: Notification) -> bool {
        self.wait_for(|m| *m == BackendMessage::Notification(notification))
            .is_some()
    }

    /// Poll the window until it holds `stored` records
    pub fn wait_for_records(&mut self, stored: usize) -> Option<ChannelWindow> {
        let deadline = Instant::now() + test_timeout();
        while Instant::now() < deadline {
            self.frontend.request_window();
            let stats = self.wait_for(|m| matches!(m, BackendMessage::Stats(_)));
            if let Some(BackendMessage::Stats(stats)) = stats {
                if stats.cache_len >= stored {
                    return self.last_window();
                }
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        None
    }

    pub fn last_window(&self) -> Option<ChannelWindow> {
        self.received.iter().rev().find_map(|m| match m {
            BackendMessage::Window(w) => Some(w.clone()),
            _ => None,
        })
    }

    pub fn count_notifications(&self, notification: Notification) -> usize {
        self.received
            .iter()
            .filter(|m| **m == BackendMessage::Notification(notification))
            .count()
    }

    /// Connect to the test device and wait until the session is up
    pub fn connect(&mut self, capacity: Option<usize>) {
        self.frontend.connect(TEST_DEVICE, capacity);
        assert!(
            self.wait_for_status(ConnectionStatus::Connected),
            "device did not connect"
        );
    }

    /// Send shutdown and join the backend thread
    pub fn shutdown(&mut self) -> bool {
        self.frontend.shutdown();
        self.handle
            .take()
            .map(|h| h.join().is_ok())
            .unwrap_or(true)
    }
}

impl Drop for RunningBackend {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown();
        }
    }
}
