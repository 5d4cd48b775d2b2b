//! Framed message link over a serial port, and discovery of the port a
//! device is attached to.
//!
//! A [`Link`] glues the HDLC-style frame codec to a byte stream: it frames
//! and writes payloads or [`Message`](serbridge_frame::Message)s, and hands
//! received frames out one at a time, in order. [`Discovery`] pings each
//! candidate port through a short-lived link and reports the first one
//! whose device echoes back.

pub mod config;
pub mod discovery;
pub mod error;
pub mod link;

pub use config::{LinkConfig, DEFAULT_MAX_PAYLOAD, DEFAULT_PROBE_TIMEOUT};
pub use discovery::{probe, rank_ports, Discovery, Platform};
pub use error::{LinkError, Result};
pub use link::{Link, Outgoing};
