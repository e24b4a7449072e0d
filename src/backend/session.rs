//! Device session state machine
//!
//! ```text
//! Closed ──open()──► Opening ──ok──► Open{paused: false} ◄─resume/pause─► Open{paused: true}
//!    ▲                  │                         │
//!    └──── failure ─────┘                         └──────── close() ───────► Closed
//! ```
//!
//! The session exclusively owns the link, its framer thread and the liveness
//! watchdog. All three exist exactly while the session is open: `open` creates
//! them together and `close` tears all of them down, in that order: framer,
//! watchdog, link.

use crate::backend::codec::{looks_like_frame, PROBE_LEN};
use crate::backend::framer::{spawn_framer, FramerHandle, LinkEvent};
use crate::backend::port_trait::{PortDriver, SerialLink};
use crate::backend::watchdog::{Liveness, Watchdog};
use crate::config::SerialConfig;
use crate::error::{MoniError, Result};
use crate::types::DeviceInfo;
use crossbeam_channel::{Receiver, Sender};
use std::time::{Duration, Instant};

/// Lifecycle state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Closed,
    Opening,
    Open {
        paused: bool,
    },
}

/// The single device session of the process
pub struct DeviceSession {
    state: SessionState,
    device: DeviceInfo,
    link: Option<Box<dyn SerialLink>>,
    framer: Option<FramerHandle>,
    watchdog: Option<Watchdog>,
    /// Incremented on every successful open; tags framer events
    generation: u64,
    /// Frames the last closed framer dropped on a full event channel
    dropped_at_close: u64,
    events: Sender<LinkEvent>,
    serial: SerialConfig,
    watchdog_interval: Duration,
}

impl DeviceSession {
    /// Create a closed session whose framers will report to `events`
    pub fn new(serial: SerialConfig, watchdog_interval: Duration, events: Sender<LinkEvent>) -> Self {
        Self {
            state: SessionState::Closed,
            device: DeviceInfo::default(),
            link: None,
            framer: None,
            watchdog: None,
            generation: 0,
            dropped_at_close: 0,
            events,
            serial,
            watchdog_interval,
        }
    }

    /// Open `port_name` for `device_name`
    ///
    /// Already open: logged and ignored; close first to reopen with other
    /// settings. On any failure the session is left `Closed`.
    pub fn open(&mut self, driver: &dyn PortDriver, device_name: &str, port_name: &str) -> Result<()> {
        if self.is_open() {
            tracing::info!(
                "Session already open on {}, ignoring open of {}",
                self.device.port,
                port_name
            );
            return Ok(());
        }

        self.state = SessionState::Opening;
        match self.open_link(driver, port_name) {
            Ok(()) => {
                self.device = DeviceInfo::connected(device_name, port_name);
                self.state = SessionState::Open { paused: false };
                tracing::info!(
                    "Session open: {} on {} (generation {})",
                    device_name,
                    port_name,
                    self.generation
                );
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Closed;
                tracing::warn!("Failed to open {}: {}", port_name, e);
                Err(e)
            }
        }
    }

    fn open_link(&mut self, driver: &dyn PortDriver, port_name: &str) -> Result<()> {
        let mut link = driver.open(port_name, &self.serial).map_err(|e| match e {
            e @ MoniError::PortOpen { .. } => e,
            other => MoniError::PortOpen {
                port: port_name.to_string(),
                message: other.to_string(),
            },
        })?;

        if self.serial.verify_device {
            if let Err(e) = self.verify(link.as_mut()) {
                discard_link(link.as_mut());
                return Err(e);
            }
        }

        let reader = match link.frame_reader() {
            Ok(reader) => reader,
            Err(e) => {
                discard_link(link.as_mut());
                return Err(e);
            }
        };

        let generation = self.generation + 1;
        let framer = match spawn_framer(
            reader,
            generation,
            self.events.clone(),
            self.serial.max_frame_len,
        ) {
            Ok(framer) => framer,
            Err(e) => {
                discard_link(link.as_mut());
                return Err(e);
            }
        };

        self.generation = generation;
        self.dropped_at_close = 0;
        self.framer = Some(framer);
        self.watchdog = Some(Watchdog::start(port_name, self.watchdog_interval));
        self.link = Some(link);
        Ok(())
    }

    /// Check that the link carries instrument frames
    ///
    /// The port is usually joined mid-frame, so bytes up to the first
    /// newline are skipped before the probe is read. Both steps share one
    /// probe timeout.
    fn verify(&self, link: &mut dyn SerialLink) -> Result<()> {
        let port = link.port_name().to_string();
        let deadline = Instant::now() + self.serial.probe_timeout();
        let mut probe = [0u8; PROBE_LEN];

        let read = skip_to_frame_start(link, deadline).and_then(|skipped| {
            tracing::trace!("Skipped {} bytes on {} before the probe", skipped, port);
            link.read_probe(&mut probe, deadline.saturating_duration_since(Instant::now()))
        });
        if let Err(e) = read {
            tracing::debug!("Probe read on {} failed: {}", port, e);
            return Err(MoniError::Verification(port));
        }
        if !looks_like_frame(&probe) {
            tracing::debug!(
                "Probe on {} has the wrong shape: {:?}",
                port,
                String::from_utf8_lossy(&probe)
            );
            return Err(MoniError::Verification(port));
        }
        tracing::debug!("Device on {} verified", port);
        Ok(())
    }

    /// Close the session; closing a closed session does nothing
    ///
    /// Local state is always discarded. A close error of the port is returned
    /// after teardown has finished.
    pub fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed && self.link.is_none() {
            return Ok(());
        }

        let port = self.device.port.clone();
        let mut first_error: Option<MoniError> = None;

        if let Some(mut framer) = self.framer.take() {
            let stopped = framer.stop();
            self.dropped_at_close = framer.dropped_frames();
            if let Err(e) = stopped {
                first_error = Some(e);
            }
        }
        if let Some(mut watchdog) = self.watchdog.take() {
            watchdog.stop();
        }
        if let Some(mut link) = self.link.take() {
            if let Err(e) = link.close() {
                first_error = first_error.or(Some(e));
            }
        }

        self.device = DeviceInfo::default();
        self.state = SessionState::Closed;

        match first_error {
            None => {
                tracing::info!("Session closed ({})", port);
                Ok(())
            }
            Some(e @ MoniError::PortClose { .. }) => Err(e),
            Some(other) => Err(MoniError::PortClose {
                port,
                message: other.to_string(),
            }),
        }
    }

    /// Stop storing frames; the link keeps being read
    pub fn pause(&mut self) {
        match self.state {
            SessionState::Open { paused: false } => {
                self.state = SessionState::Open { paused: true };
                tracing::debug!("Session paused");
            }
            SessionState::Open { paused: true } => {}
            _ => tracing::info!("Pause ignored: no open session"),
        }
    }

    /// Resume storing frames
    pub fn resume(&mut self) {
        match self.state {
            SessionState::Open { paused: true } => {
                self.state = SessionState::Open { paused: false };
                tracing::debug!("Session resumed");
            }
            SessionState::Open { paused: false } => {}
            _ => tracing::info!("Resume ignored: no open session"),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, SessionState::Open { paused: true })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn device_info(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Frames dropped by the framer of the current or last link
    pub fn dropped_frames(&self) -> u64 {
        self.framer
            .as_ref()
            .map_or(self.dropped_at_close, |f| f.dropped_frames())
    }

    /// Whether an event comes from the currently open link
    pub fn accepts(&self, event: &LinkEvent) -> bool {
        self.is_open() && event.generation == self.generation
    }

    /// Ticker of the running watchdog
    pub fn watchdog_ticker(&self) -> Option<&Receiver<Instant>> {
        self.watchdog.as_ref().map(|w| w.ticker())
    }

    pub fn has_watchdog(&self) -> bool {
        self.watchdog.as_ref().is_some_and(|w| w.is_active())
    }

    /// Run one watchdog check
    pub fn check_liveness(&self, driver: &dyn PortDriver) -> Liveness {
        match &self.watchdog {
            Some(watchdog) => watchdog.check(driver),
            None => Liveness::Inactive,
        }
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Error closing session on drop: {}", e);
        }
    }
}

/// Read and drop bytes up to and including the next `\n`
fn skip_to_frame_start(link: &mut dyn SerialLink, deadline: Instant) -> Result<usize> {
    let mut byte = [0u8; 1];
    let mut skipped = 0;
    loop {
        link.read_probe(&mut byte, deadline.saturating_duration_since(Instant::now()))?;
        skipped += 1;
        if byte[0] == b'\n' {
            return Ok(skipped);
        }
    }
}

fn discard_link(link: &mut dyn SerialLink) {
    if let Err(e) = link.close() {
        tracing::debug!("Ignoring close error on {}: {}", link.port_name(), e);
    }
}
