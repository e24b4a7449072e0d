//! Data published by the backend and read by the UI panels.
//!
//! The app writes to it from `process_backend_messages()`; everything else
//! only reads it.

use std::time::{Duration, Instant};

use crate::backend::BackendMessage;
use crate::types::{ChannelWindow, ConnectionStatus, DeviceInfo, Notification, SessionStats};

/// How long a notification banner stays visible
pub const BANNER_DURATION: Duration = Duration::from_secs(6);

/// A notification shown at the top of the window
#[derive(Debug, Clone)]
pub struct Banner {
    pub notification: Notification,
    pub shown_at: Instant,
}

impl Banner {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.shown_at) >= BANNER_DURATION
    }
}

/// Everything the backend has told the UI so far
#[derive(Default)]
pub struct Topics {
    pub connection_status: ConnectionStatus,
    pub device: DeviceInfo,
    /// Latest display window
    pub window: ChannelWindow,
    pub stats: SessionStats,
    /// Device names from the last refresh
    pub devices: Vec<String>,
    /// Most recent notification, if still shown
    pub banner: Option<Banner>,
    /// Set once the backend reported shutdown
    pub backend_stopped: bool,
}

impl Topics {
    /// Fold one backend message into the topics
    pub fn apply(&mut self, msg: BackendMessage) {
        match msg {
            BackendMessage::Notification(notification) => {
                if notification.is_error() {
                    tracing::warn!("{}", notification);
                } else {
                    tracing::info!("{}", notification);
                }
                self.banner = Some(Banner {
                    notification,
                    shown_at: Instant::now(),
                });
            }
            BackendMessage::DeviceInfo(info) => self.device = info,
            BackendMessage::ConnectionStatus(status) => self.connection_status = status,
            BackendMessage::Window(window) => self.window = window,
            BackendMessage::DeviceList(devices) => {
                tracing::info!("Received {} devices", devices.len());
                self.devices = devices;
            }
            BackendMessage::Stats(stats) => self.stats = stats,
            BackendMessage::Shutdown => {
                tracing::info!("Backend shutdown received");
                self.backend_stopped = true;
            }
        }
    }

    /// Drop the banner once it has been shown long enough
    pub fn expire_banner(&mut self, now: Instant) {
        if self.banner.as_ref().is_some_and(|b| b.is_expired(now)) {
            self.banner = None;
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection_status != ConnectionStatus::Disconnected
    }

    pub fn is_monitoring(&self) -> bool {
        self.connection_status == ConnectionStatus::Monitoring
    }
}
