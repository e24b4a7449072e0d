//! Liveness watchdog
//!
//! A closed serial port does not always produce a read error when a USB
//! device is pulled, so the session also re-enumerates the OS ports on a
//! fixed interval and checks that its port is still listed.
//!
//! The watchdog does not own a thread. It exposes a `crossbeam` ticker that
//! the coordinator selects on, and [`Watchdog::check`] is run on each tick.
//! Stopping replaces the ticker with one that never fires.

use crate::backend::port_trait::PortDriver;
use crossbeam_channel::{never, tick, Receiver};
use std::time::{Duration, Instant};

/// Result of one liveness check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Liveness {
    /// The bound port is still enumerated
    Present,
    /// The bound port has disappeared
    Missing,
    /// Enumeration failed; nothing can be concluded
    Unknown(String),
    /// The watchdog is stopped
    Inactive,
}

/// Periodic presence check for one port
#[derive(Debug)]
pub struct Watchdog {
    port_name: String,
    interval: Duration,
    ticker: Receiver<Instant>,
    active: bool,
}

impl Watchdog {
    /// Start watching `port_name`
    pub fn start(port_name: impl Into<String>, interval: Duration) -> Self {
        let port_name = port_name.into();
        tracing::debug!("Watchdog started for {} every {:?}", port_name, interval);
        Self {
            port_name,
            interval,
            ticker: tick(interval),
            active: true,
        }
    }

    /// Ticker to select on; never fires once stopped
    pub fn ticker(&self) -> &Receiver<Instant> {
        &self.ticker
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Enumerate ports and look for the watched one
    pub fn check(&self, driver: &dyn PortDriver) -> Liveness {
        if !self.active {
            return Liveness::Inactive;
        }
        match driver.available_ports() {
            Ok(ports) if ports.iter().any(|p| p.port_name == self.port_name) => {
                tracing::trace!("Watchdog: {} present", self.port_name);
                Liveness::Present
            }
            Ok(_) => {
                tracing::warn!("Watchdog: {} is no longer enumerated", self.port_name);
                Liveness::Missing
            }
            Err(e) => {
                tracing::debug!("Watchdog: port scan failed: {}", e);
                Liveness::Unknown(e.to_string())
            }
        }
    }

    /// Stop the watchdog; calling it again is harmless
    pub fn stop(&mut self) {
        if self.active {
            tracing::debug!("Watchdog stopped for {}", self.port_name);
        }
        self.active = false;
        self.ticker = never();
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::port_trait::{MockPortDriver, PortDescriptor};
    use crate::error::MoniError;

    #[test]
    fn test_present_port() {
        let mut driver = MockPortDriver::new();
        driver.expect_available_ports().times(1).returning(|| {
            Ok(vec![
                PortDescriptor::usb("/dev/ttyUSB0", "A"),
                PortDescriptor::usb("/dev/ttyUSB1", "B"),
            ])
        });

        let watchdog = Watchdog::start("/dev/ttyUSB1", Duration::from_secs(1));
        assert_eq!(watchdog.check(&driver), Liveness::Present);
    }

    #[test]
    fn test_missing_port() {
        let mut driver = MockPortDriver::new();
        driver
            .expect_available_ports()
            .times(1)
            .returning(|| Ok(vec![PortDescriptor::usb("/dev/ttyUSB0", "A")]));

        let watchdog = Watchdog::start("/dev/ttyUSB1", Duration::from_secs(1));
        assert_eq!(watchdog.check(&driver), Liveness::Missing);
    }

    #[test]
    fn test_scan_failure_is_inconclusive() {
        let mut driver = MockPortDriver::new();
        driver
            .expect_available_ports()
            .returning(|| Err(MoniError::PortScan("udev gone".to_string())));

        let watchdog = Watchdog::start("/dev/ttyUSB1", Duration::from_secs(1));
        assert!(matches!(watchdog.check(&driver), Liveness::Unknown(_)));
    }

    #[test]
    fn test_stopped_watchdog_does_not_scan() {
        let mut driver = MockPortDriver::new();
        driver.expect_available_ports().times(0);

        let mut watchdog = Watchdog::start("/dev/ttyUSB1", Duration::from_millis(10));
        watchdog.stop();
        watchdog.stop();
        assert!(!watchdog.is_active());
        assert_eq!(watchdog.check(&driver), Liveness::Inactive);
    }

    #[test]
    fn test_ticker_fires_until_stopped() {
        let mut watchdog = Watchdog::start("/dev/ttyUSB1", Duration::from_millis(10));
        assert!(watchdog
            .ticker()
            .recv_timeout(Duration::from_millis(500))
            .is_ok());

        watchdog.stop();
        assert!(watchdog
            .ticker()
            .recv_timeout(Duration::from_millis(50))
            .is_err());
    }
}
