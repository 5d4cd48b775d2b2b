use serbridge_frame::FrameError;
use serbridge_transport::TransportError;

/// Errors that can occur on a link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Opening or enumerating ports failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error, including checksum failures on receive.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Writing to or flushing the stream failed.
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    /// Payload exceeds the link's maximum payload size; nothing was sent.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Link configuration is out of range.
    #[error("invalid link configuration: {0}")]
    InvalidConfig(String),
}

impl LinkError {
    /// True when a received frame failed checksum verification.
    pub fn is_checksum_mismatch(&self) -> bool {
        matches!(self, LinkError::Frame(err) if err.is_checksum_mismatch())
    }

    /// True when the peer closed the stream.
    pub fn is_closed(&self) -> bool {
        matches!(self, LinkError::Frame(FrameError::ConnectionClosed))
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;
