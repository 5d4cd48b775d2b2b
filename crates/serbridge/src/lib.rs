//! Framed, checksummed messaging with microcontrollers over serial ports.
//!
//! serbridge frames binary messages with HDLC-style byte stuffing and a
//! CRC-16, carries them over a serial line, and finds the port a device is
//! attached to by pinging every candidate.
//!
//! # Crate Structure
//!
//! - [`transport`]: Serial port access and port enumeration
//! - [`frame`]: Frame codec, CRC-16 and the 9-byte message header
//! - [`link`]: Framed link over a port, and device discovery (behind `link` feature)
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use serbridge::frame::{Command, Message};
//! use serbridge::link::{Discovery, Link, LinkConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LinkConfig::default();
//! if let Some(port) = Discovery::new(config.clone()).run()? {
//!     let mut link = Link::open(&port, &config)?;
//!     link.send(&Message::new(Command::Raw, 1, &b"relay on"[..]))?;
//!     let reply = link.receive_message(Some(Duration::from_secs(1)))?;
//!     println!("{reply:?}");
//! }
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use serbridge_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use serbridge_frame::*;
}

/// Re-export link and discovery types (requires `link` feature).
#[cfg(feature = "link")]
pub mod link {
    pub use serbridge_link::*;
}
