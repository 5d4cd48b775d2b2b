/// Errors that can occur during frame and message encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A complete frame arrived but its trailing CRC does not match.
    #[error("frame checksum mismatch (received {received:#06x}, computed {computed:#06x})")]
    ChecksumMismatch { received: u16, computed: u16 },

    /// A message header field does not fit its wire width.
    #[error("{field} out of range ({value}, max {max})")]
    FieldOutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },

    /// Fewer bytes than the header plus declared payload length.
    #[error("malformed message ({available} bytes, need {needed})")]
    MalformedMessage { needed: usize, available: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream reached EOF.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// True for a frame that arrived complete but failed CRC verification.
    pub fn is_checksum_mismatch(&self) -> bool {
        matches!(self, FrameError::ChecksumMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
