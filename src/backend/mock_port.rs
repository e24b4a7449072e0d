//! Simulated serial ports
//!
//! This module provides an in-memory [`PortDriver`] so the coordinator can be
//! exercised without hardware. Ports can be plugged and unplugged at
//! runtime, each port carries a byte stream that tests feed line by line,
//! and scan/open/close failures can be injected.
//!
//! # Example
//!
//! ```ignore
//! use moni_helper::backend::mock_port::SimulatedPorts;
//!
//! let ports = SimulatedPorts::new();
//! let device = ports.add_device("/dev/ttySIM0", "MH0001");
//!
//! // Hand a clone to the backend, keep the other to drive the device
//! let (backend, frontend) = MoniBackend::new(config, Box::new(ports.clone()));
//! device.send_line("100,200,300,4000");
//! device.unplug();
//! ```
//!
//! # Demo signal
//!
//! [`SimulatedPorts::with_demo_device`] adds a port that streams a synthetic
//! four-channel signal while it is open. The desktop binary uses it when
//! built with the `mock-device` feature:
//!
//! ```bash
//! cargo run --features mock-device
//! ```

use crate::backend::port_trait::{read_exact_within, PortDescriptor, PortDriver, SerialLink};
use crate::config::SerialConfig;
use crate::error::{MoniError, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Port name of the demo device
pub const DEMO_PORT: &str = "/dev/ttySIM0";

/// Device name (serial number) of the demo device
pub const DEMO_DEVICE: &str = "MOCK0001";

/// Interval between demo frames
const DEMO_FRAME_INTERVAL: Duration = Duration::from_millis(10);

struct SimPort {
    descriptor: PortDescriptor,
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
    broken: Arc<AtomicBool>,
    open: bool,
    plugged: bool,
}

#[derive(Default)]
struct SimState {
    ports: Vec<SimPort>,
    fail_scan: bool,
    fail_open: bool,
    fail_close: bool,
    scans: usize,
    opens: usize,
    closes: usize,
}

impl SimState {
    fn port_mut(&mut self, port_name: &str) -> Option<&mut SimPort> {
        self.ports
            .iter_mut()
            .find(|p| p.descriptor.port_name == port_name)
    }
}

/// In-memory port driver; clones share the same set of ports
#[derive(Clone, Default)]
pub struct SimulatedPorts {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedPorts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver with one demo device streaming a synthetic signal
    pub fn with_demo_device() -> Self {
        let ports = Self::new();
        let device = ports.add_device(DEMO_PORT, DEMO_DEVICE);
        spawn_demo_signal(device);
        ports
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Plug in a USB device with the given serial number
    pub fn add_device(&self, port_name: &str, serial_number: &str) -> SimDevice {
        let (tx, rx) = unbounded();
        let broken = Arc::new(AtomicBool::new(false));
        let mut state = self.lock();
        state.ports.retain(|p| p.descriptor.port_name != port_name);
        state.ports.push(SimPort {
            descriptor: PortDescriptor::usb(port_name, serial_number),
            tx: tx.clone(),
            rx,
            broken: broken.clone(),
            open: false,
            plugged: true,
        });

        SimDevice {
            port_name: port_name.to_string(),
            tx,
            broken,
            ports: self.clone(),
        }
    }

    /// Add a port without a serial number (never matches a device name)
    pub fn add_anonymous_port(&self, port_name: &str) {
        let (tx, rx) = unbounded();
        self.lock().ports.push(SimPort {
            descriptor: PortDescriptor {
                port_name: port_name.to_string(),
                ..Default::default()
            },
            tx,
            rx,
            broken: Arc::new(AtomicBool::new(false)),
            open: false,
            plugged: true,
        });
    }

    /// Make the next enumerations fail
    pub fn set_fail_scan(&self, fail: bool) {
        self.lock().fail_scan = fail;
    }

    /// Make the next opens fail
    pub fn set_fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    /// Make the next closes report an error
    pub fn set_fail_close(&self, fail: bool) {
        self.lock().fail_close = fail;
    }

    /// Whether the port is currently held open by a link
    pub fn is_port_open(&self, port_name: &str) -> bool {
        self.lock()
            .ports
            .iter()
            .any(|p| p.descriptor.port_name == port_name && p.open)
    }

    /// Number of enumerations performed so far
    pub fn scan_count(&self) -> usize {
        self.lock().scans
    }

    /// Number of successful opens so far
    pub fn open_count(&self) -> usize {
        self.lock().opens
    }

    /// Number of close calls so far
    pub fn close_count(&self) -> usize {
        self.lock().closes
    }
}

impl PortDriver for SimulatedPorts {
    fn available_ports(&self) -> Result<Vec<PortDescriptor>> {
        let mut state = self.lock();
        state.scans += 1;
        if state.fail_scan {
            return Err(MoniError::PortScan("simulated scan failure".to_string()));
        }
        Ok(state
            .ports
            .iter()
            .filter(|p| p.plugged)
            .map(|p| p.descriptor.clone())
            .collect())
    }

    fn open(&self, port_name: &str, config: &SerialConfig) -> Result<Box<dyn SerialLink>> {
        let mut state = self.lock();
        let fail_open = state.fail_open;
        let open_error = |message: &str| MoniError::PortOpen {
            port: port_name.to_string(),
            message: message.to_string(),
        };

        if fail_open {
            return Err(open_error("simulated open failure"));
        }
        let port = match state.port_mut(port_name) {
            Some(port) if port.plugged => port,
            _ => return Err(open_error("No such device")),
        };
        if port.open {
            return Err(open_error("Device or resource busy"));
        }

        // Bytes sent while nobody listened are gone, like a fresh OS buffer
        while port.rx.try_recv().is_ok() {}
        port.open = true;
        port.broken.store(false, Ordering::SeqCst);

        let reader = ChannelReader {
            rx: port.rx.clone(),
            pending: Vec::new(),
            timeout: config.read_timeout(),
            broken: port.broken.clone(),
        };
        state.opens += 1;

        Ok(Box::new(SimLink {
            port_name: port_name.to_string(),
            reader: Some(reader),
            ports: self.clone(),
            closed: false,
        }))
    }
}

/// Test-side handle to a plugged simulated device
#[derive(Clone)]
pub struct SimDevice {
    port_name: String,
    tx: Sender<Vec<u8>>,
    broken: Arc<AtomicBool>,
    ports: SimulatedPorts,
}

impl SimDevice {
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Send one line; a trailing newline is appended
    pub fn send_line(&self, line: &str) {
        let mut bytes = line.as_bytes().to_vec();
        bytes.push(b'\n');
        self.send_bytes(&bytes);
    }

    /// Send raw bytes
    pub fn send_bytes(&self, bytes: &[u8]) {
        let _ = self.tx.send(bytes.to_vec());
    }

    /// Remove the device from the port enumeration
    pub fn unplug(&self) {
        if let Some(port) = self.ports.lock().port_mut(&self.port_name) {
            port.plugged = false;
        }
    }

    /// Put the device back into the port enumeration
    pub fn replug(&self) {
        if let Some(port) = self.ports.lock().port_mut(&self.port_name) {
            port.plugged = true;
        }
    }

    /// Make reads on the open link fail with an I/O error
    pub fn break_stream(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    pub fn is_open(&self) -> bool {
        self.ports.is_port_open(&self.port_name)
    }
}

/// Blocking reader over the byte chunks of one simulated port
pub struct ChannelReader {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    timeout: Duration,
    broken: Arc<AtomicBool>,
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(
                ErrorKind::BrokenPipe,
                "simulated device stopped responding",
            ));
        }
        if self.pending.is_empty() {
            match self.rx.recv_timeout(self.timeout) {
                Ok(chunk) => self.pending = chunk,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(std::io::Error::new(ErrorKind::TimedOut, "read timed out"))
                }
                Err(RecvTimeoutError::Disconnected) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

struct SimLink {
    port_name: String,
    reader: Option<ChannelReader>,
    ports: SimulatedPorts,
    closed: bool,
}

impl SerialLink for SimLink {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn read_probe(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        let reader = self.reader.as_mut().ok_or_else(|| {
            MoniError::Channel(format!("Reader of {} was handed out", self.port_name))
        })?;
        read_exact_within(reader, buf, timeout)
    }

    fn frame_reader(&mut self) -> Result<Box<dyn Read + Send>> {
        let reader = self.reader.take().ok_or_else(|| {
            MoniError::Channel(format!("Reader of {} was handed out", self.port_name))
        })?;
        Ok(Box::new(reader))
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.reader = None;

        let mut state = self.ports.lock();
        state.closes += 1;
        let fail_close = state.fail_close;
        if let Some(port) = state.port_mut(&self.port_name) {
            port.open = false;
        }
        if fail_close {
            return Err(MoniError::PortClose {
                port: self.port_name.clone(),
                message: "simulated close failure".to_string(),
            });
        }
        Ok(())
    }
}

impl Drop for SimLink {
    fn drop(&mut self) {
        if !self.closed {
            if let Some(port) = self.ports.lock().port_mut(&self.port_name) {
                port.open = false;
            }
        }
    }
}

/// Four demo channels, formatted so every line is a valid 17 byte probe
pub fn demo_frame(t: f64) -> String {
    use std::f64::consts::TAU;

    let c1 = 500.0 + 300.0 * (TAU * 0.5 * t).sin();
    let c2 = 500.0 + 200.0 * (TAU * 0.2 * t).cos();
    let phase = (t * 0.25).fract();
    let triangle = if phase < 0.5 { phase * 2.0 } else { 2.0 - phase * 2.0 };
    let c3 = 150.0 + 800.0 * triangle;
    let c4 = 2000.0 + 1000.0 * (TAU * 0.05 * t).sin();

    format!("{:.0},{:.0},{:.0},{:.0}", c1, c2, c3, c4)
}

fn spawn_demo_signal(device: SimDevice) {
    let spawned = std::thread::Builder::new()
        .name("demo-signal".to_string())
        .spawn(move || {
            let start = Instant::now();
            loop {
                std::thread::sleep(DEMO_FRAME_INTERVAL);
                if device.is_open() {
                    device.send_line(&demo_frame(start.elapsed().as_secs_f64()));
                }
            }
        });
    if let Err(e) = spawned {
        tracing::error!("Failed to start demo signal thread: {}", e);
    }
}
