//! Per-link settings.

use std::time::Duration;

use serbridge_frame::{FrameConfig, DEFAULT_MAX_FRAME_LEN, MAX_MESSAGE_PAYLOAD};
use serbridge_transport::SerialSettings;

use crate::error::{LinkError, Result};

/// Default maximum payload per frame.
pub const DEFAULT_MAX_PAYLOAD: usize = 128;

/// Default wait for a discovery ping reply.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration for a [`Link`](crate::Link).
///
/// The payload limit and checksum mode are fixed for the lifetime of a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Largest payload `send` accepts, 1..=65535.
    pub max_payload: usize,
    /// Verify the CRC of every received frame.
    pub require_crc: bool,
    /// Line settings used when the link opens a serial port.
    pub serial: SerialSettings,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            max_payload: DEFAULT_MAX_PAYLOAD,
            require_crc: false,
            serial: SerialSettings::default(),
        }
    }
}

impl LinkConfig {
    /// Check that the payload limit is in range.
    pub fn validate(&self) -> Result<()> {
        if self.max_payload == 0 || self.max_payload > MAX_MESSAGE_PAYLOAD {
            return Err(LinkError::InvalidConfig(format!(
                "max_payload must be between 1 and {MAX_MESSAGE_PAYLOAD}, got {}",
                self.max_payload
            )));
        }
        Ok(())
    }

    /// Deframer settings for the receive direction.
    ///
    /// `max_payload` only limits what this side sends; incoming frames are
    /// accepted up to [`DEFAULT_MAX_FRAME_LEN`].
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            escape_ctrl: true,
            require_crc: self.require_crc,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}
