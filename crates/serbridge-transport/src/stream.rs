use std::io::{Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::debug;

use crate::error::{Result, TransportError};

/// Default line speed used when none is configured.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default per-read timeout of an opened port.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

/// Line settings applied when a port is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    /// Line speed in bits per second.
    pub baud_rate: u32,
    /// How long a single read blocks when no byte is available.
    /// Also bounds how long a write may block.
    pub timeout: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// An open serial port implementing `Read` and `Write`.
///
/// A read blocks until at least one byte arrives or the configured timeout
/// elapses, in which case it fails with [`std::io::ErrorKind::TimedOut`].
/// The port is closed when the stream is dropped.
pub struct SerialStream {
    inner: Box<dyn SerialPort>,
    name: String,
}

impl SerialStream {
    /// Open `port` with the given line settings.
    pub fn open(port: &str, settings: &SerialSettings) -> Result<Self> {
        let inner = serialport::new(port, settings.baud_rate)
            .timeout(settings.timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: port.to_string(),
                source,
            })?;
        debug!(
            port,
            baud_rate = settings.baud_rate,
            timeout = ?settings.timeout,
            "opened serial port"
        );
        Ok(Self {
            inner,
            name: port.to_string(),
        })
    }

    /// The port name this stream was opened with.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialStream")
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let settings = SerialSettings::default();
        assert_eq!(settings.baud_rate, 115_200);
        assert_eq!(settings.timeout, Duration::from_millis(100));
    }

    #[test]
    fn open_missing_port_fails() {
        let port = format!("/dev/serbridge-missing-{}", std::process::id());
        let err = SerialStream::open(&port, &SerialSettings::default()).unwrap_err();
        match err {
            TransportError::Open { port: name, .. } => assert_eq!(name, port),
            other => panic!("expected open error, got {other:?}"),
        }
    }
}
