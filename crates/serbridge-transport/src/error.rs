/// Errors that can occur in serial transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the named port.
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    /// Failed to enumerate the ports visible to the host.
    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(serialport::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// The I/O error kind behind this error, when there is one.
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            TransportError::Io(err) => Some(err.kind()),
            TransportError::Open { source, .. } | TransportError::Enumerate(source) => {
                match source.kind() {
                    serialport::ErrorKind::Io(kind) => Some(kind),
                    serialport::ErrorKind::NoDevice => Some(std::io::ErrorKind::NotFound),
                    _ => None,
                }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
