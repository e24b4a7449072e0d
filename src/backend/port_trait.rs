//! Port driver traits
//!
//! The coordinator never talks to `serialport` directly. It goes through
//! [`PortDriver`] (enumerate and open ports) and [`SerialLink`] (one open
//! port), so the same session logic runs against real hardware
//! ([`SystemPorts`](crate::backend::serial::SystemPorts)) and the in-memory
//! simulator ([`SimulatedPorts`](crate::backend::mock_port::SimulatedPorts)).

use crate::config::SerialConfig;
use crate::error::{MoniError, Result};
use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};

/// One port as reported by the OS enumeration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PortDescriptor {
    /// OS port identifier (`/dev/ttyUSB0`, `COM3`, ...)
    pub port_name: String,
    /// USB serial number; used as the device name
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl PortDescriptor {
    /// Descriptor for a USB port with a serial number
    pub fn usb(port_name: impl Into<String>, serial_number: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            serial_number: Some(serial_number.into()),
            ..Default::default()
        }
    }
}

/// Enumerates and opens serial ports
#[cfg_attr(test, mockall::automock)]
pub trait PortDriver: Send {
    /// List every port visible to the OS
    fn available_ports(&self) -> Result<Vec<PortDescriptor>>;

    /// Open `port_name` with the given settings
    fn open(&self, port_name: &str, config: &SerialConfig) -> Result<Box<dyn SerialLink>>;
}

/// An open serial port owned by the device session
pub trait SerialLink: Send {
    /// OS identifier of the port
    fn port_name(&self) -> &str;

    /// Fill `buf` completely, giving up once `timeout` has elapsed
    fn read_probe(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()>;

    /// Independent reader over the same port, handed to the framer thread
    fn frame_reader(&mut self) -> Result<Box<dyn Read + Send>>;

    /// Close the port; the link must not be used afterwards
    fn close(&mut self) -> Result<()>;
}

/// Find the port whose USB serial number equals `device_name`
pub fn find_device_port<'a>(
    ports: &'a [PortDescriptor],
    device_name: &str,
) -> Option<&'a PortDescriptor> {
    ports
        .iter()
        .find(|p| p.serial_number.as_deref() == Some(device_name))
}

/// Serial numbers of all enumerated ports, in enumeration order
pub fn device_names(ports: &[PortDescriptor]) -> Vec<String> {
    ports
        .iter()
        .filter_map(|p| p.serial_number.clone())
        .collect()
}

/// Read exactly `buf.len()` bytes from a reader with a short read timeout
///
/// Timeouts of individual reads are retried until `timeout` has elapsed.
pub fn read_exact_within(reader: &mut dyn Read, buf: &mut [u8], timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    let mut filled = 0;

    while filled < buf.len() {
        if Instant::now() >= deadline {
            return Err(MoniError::Timeout(format!(
                "read {} of {} probe bytes in {:?}",
                filled,
                buf.len(),
                timeout
            )));
        }
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(MoniError::Io(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "port closed during probe",
                )))
            }
            Ok(n) => filled += n,
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) => {}
            Err(e) => return Err(MoniError::Io(e)),
        }
    }
    Ok(())
}
