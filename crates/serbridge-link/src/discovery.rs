//! Locating the port a device is attached to.
//!
//! Candidate ports are ordered by how likely they are to host a USB serial
//! device on the current platform, then probed one at a time: a port is
//! live when the device echoes a ping carrying the same id.

use std::io::{Read, Write};
use std::time::Duration;

use serbridge_frame::{Command, Message};
use serbridge_transport::{available_ports, SerialStream, TransportError};
use tracing::{debug, info};

use crate::config::{LinkConfig, DEFAULT_PROBE_TIMEOUT};
use crate::error::Result;
use crate::link::Link;

/// Host platform, which decides the port naming conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl Platform {
    /// Platform this binary was built for.
    pub fn current() -> Self {
        if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Other
        }
    }

    fn is_likely(self, port: &str) -> bool {
        match self {
            Platform::Linux => ["/dev/ttyUSB", "/dev/ttyACM", "/dev/ttyS"]
                .iter()
                .any(|pattern| port.contains(pattern)),
            Platform::MacOs => [
                "/dev/cu.usbserial",
                "/dev/cu.usbmodem",
                "/dev/cu.SLAB_USBtoUART",
                "/dev/cu.wchusbserial",
            ]
            .iter()
            .any(|pattern| port.contains(pattern)),
            Platform::Windows => port.starts_with("COM"),
            Platform::Other => true,
        }
    }
}

/// Order `ports` for probing.
///
/// Ports matching the platform's naming patterns come first (USB devices
/// ahead of built-in UARTs, COM ports by number), followed by every other
/// port in lexicographic order.
pub fn rank_ports<S: AsRef<str>>(platform: Platform, ports: &[S]) -> Vec<String> {
    let mut all: Vec<String> = ports.iter().map(|p| p.as_ref().to_string()).collect();
    all.sort();
    all.dedup();

    let (mut likely, rest): (Vec<String>, Vec<String>) =
        all.into_iter().partition(|port| platform.is_likely(port));

    match platform {
        Platform::Linux => {
            likely.sort_by_key(|port| !(port.contains("USB") || port.contains("ACM")));
        }
        Platform::MacOs => {
            likely.sort_by_key(|port| !(port.contains("usbserial") || port.contains("usbmodem")));
        }
        Platform::Windows => {
            likely.sort_by_key(|port| port[3..].parse::<u32>().unwrap_or(999));
        }
        Platform::Other => {}
    }

    likely.extend(rest);
    likely
}

/// Ping the device behind `link` and wait for the echo.
///
/// Returns true only for a ping reply carrying `id`. Every failure,
/// including a short or empty write, counts as no device.
pub fn probe<S: Read + Write>(link: &mut Link<S>, id: u8, timeout: Duration) -> bool {
    let written = match link.send(&Message::ping(id)) {
        Ok(written) => written,
        Err(err) => {
            debug!(error = %err, "ping write failed");
            return false;
        }
    };
    if written == 0 {
        debug!("ping write accepted no bytes");
        return false;
    }

    match link.receive_message(Some(timeout)) {
        Ok(Some(reply)) if reply.command == Command::Ping && reply.id == id => true,
        Ok(Some(reply)) => {
            debug!(command = %reply.command, id = reply.id, expected = id, "unexpected reply");
            false
        }
        Ok(None) => {
            debug!(?timeout, "no reply");
            false
        }
        Err(err) => {
            debug!(error = %err, "reply failed");
            false
        }
    }
}

/// Sequential ping-based port discovery.
#[derive(Debug, Clone)]
pub struct Discovery {
    config: LinkConfig,
    platform: Platform,
    probe_timeout: Duration,
}

impl Default for Discovery {
    fn default() -> Self {
        Self::new(LinkConfig::default())
    }
}

impl Discovery {
    /// Discover with the given link settings on the current platform.
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            platform: Platform::current(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Override the platform used for ranking.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Override how long each probe waits for the echo.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Enumerate the host's ports and rank them.
    pub fn candidates(&self) -> Result<Vec<String>> {
        let ports = available_ports()?;
        let names: Vec<&str> = ports.iter().map(|port| port.name.as_str()).collect();
        Ok(rank_ports(self.platform, &names))
    }

    /// Probe the host's serial ports and return the first live one.
    ///
    /// Fails only if the ports cannot be enumerated.
    pub fn run(&self) -> Result<Option<String>> {
        let candidates = self.candidates()?;
        Ok(self.run_with(&candidates, |port, config| {
            SerialStream::open(port, &config.serial)
        }))
    }

    /// Probe `candidates` in order, opening each through `opener`.
    pub fn run_with<S, F>(&self, candidates: &[String], mut opener: F) -> Option<String>
    where
        S: Read + Write,
        F: FnMut(&str, &LinkConfig) -> std::result::Result<S, TransportError>,
    {
        info!(candidates = candidates.len(), "starting port discovery");
        let found = candidates
            .iter()
            .find(|port| self.probe_port(port, &mut opener))
            .cloned();
        match &found {
            Some(port) => info!(port = %port, "device found"),
            None => info!("no device responded"),
        }
        found
    }

    /// Open `port` through `opener`, ping it, and close it again.
    pub fn probe_port<S, F>(&self, port: &str, opener: &mut F) -> bool
    where
        S: Read + Write,
        F: FnMut(&str, &LinkConfig) -> std::result::Result<S, TransportError>,
    {
        let stream = match opener(port, &self.config) {
            Ok(stream) => stream,
            Err(err) => {
                debug!(port, error = %err, "cannot open port");
                return false;
            }
        };
        let mut link = match Link::new(stream, &self.config) {
            Ok(link) => link,
            Err(err) => {
                debug!(port, error = %err, "cannot set up link");
                return false;
            }
        };

        let id = rand::random::<u8>();
        let live = probe(&mut link, id, self.probe_timeout);
        debug!(port, id, live, "probed port");
        live
    }
}
