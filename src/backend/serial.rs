//! Serial port driver backed by the `serialport` crate
//!
//! This is the driver used against real hardware. Ports are enumerated with
//! `serialport::available_ports()`; only USB ports carry a serial number, so
//! only they can be matched to a device name.

use crate::backend::port_trait::{read_exact_within, PortDescriptor, PortDriver, SerialLink};
use crate::config::SerialConfig;
use crate::error::{MoniError, Result};
use serialport::{ClearBuffer, SerialPort, SerialPortType};
use std::io::Read;
use std::time::Duration;

/// Port driver for the ports of this machine
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPorts;

impl SystemPorts {
    pub fn new() -> Self {
        Self
    }
}

impl PortDriver for SystemPorts {
    fn available_ports(&self) -> Result<Vec<PortDescriptor>> {
        let ports =
            serialport::available_ports().map_err(|e| MoniError::PortScan(e.to_string()))?;

        Ok(ports
            .into_iter()
            .map(|p| match p.port_type {
                SerialPortType::UsbPort(info) => PortDescriptor {
                    port_name: p.port_name,
                    serial_number: info.serial_number,
                    manufacturer: info.manufacturer,
                    product: info.product,
                },
                _ => PortDescriptor {
                    port_name: p.port_name,
                    ..Default::default()
                },
            })
            .collect())
    }

    fn open(&self, port_name: &str, config: &SerialConfig) -> Result<Box<dyn SerialLink>> {
        tracing::debug!("Opening {} at {} baud", port_name, config.baud_rate);

        let port = serialport::new(port_name, config.baud_rate)
            .timeout(config.read_timeout())
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|e| MoniError::PortOpen {
                port: port_name.to_string(),
                message: e.to_string(),
            })?;

        // Bytes queued before the open are stale; verification reads fresh ones.
        if let Err(e) = port.clear(ClearBuffer::Input) {
            tracing::debug!("Could not clear input buffer of {}: {}", port_name, e);
        }

        Ok(Box::new(SystemLink {
            port_name: port_name.to_string(),
            port: Some(port),
        }))
    }
}

/// An open OS serial port
pub struct SystemLink {
    port_name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SystemLink {
    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        let name = &self.port_name;
        self.port
            .as_mut()
            .ok_or_else(|| MoniError::Channel(format!("Port {} is already closed", name)))
    }
}

impl SerialLink for SystemLink {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn read_probe(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        let port = self.port_mut()?;
        read_exact_within(port, buf, timeout)
    }

    fn frame_reader(&mut self) -> Result<Box<dyn Read + Send>> {
        let reader = self.port_mut()?.try_clone()?;
        Ok(Box::new(reader))
    }

    fn close(&mut self) -> Result<()> {
        let Some(port) = self.port.take() else {
            return Ok(());
        };
        // Dropping the handle closes the port; the clear only surfaces driver errors.
        let cleared = port.clear(ClearBuffer::All);
        drop(port);
        cleared.map_err(|e| MoniError::PortClose {
            port: self.port_name.clone(),
            message: e.to_string(),
        })
    }
}

impl Drop for SystemLink {
    fn drop(&mut self) {
        if self.port.is_some() {
            tracing::debug!("Port {} dropped without close", self.port_name);
        }
    }
}
