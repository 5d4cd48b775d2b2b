//! Serial byte-stream transport for serbridge.
//!
//! This is the lowest layer of serbridge. It opens serial ports through the
//! `serialport` crate, exposes them as plain [`std::io::Read`] +
//! [`std::io::Write`] streams, and enumerates the ports visible to the host.
//! Everything else builds on the [`SerialStream`] type provided here.

pub mod error;
pub mod ports;
pub mod stream;

pub use error::{Result, TransportError};
pub use ports::{available_ports, PortInfo, PortKind};
pub use stream::{SerialSettings, SerialStream, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT};
