use std::fmt;
use std::io;

use serbridge_frame::FrameError;
use serbridge_link::LinkError;
use serbridge_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::BrokenPipe => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    if err.io_kind() == Some(io::ErrorKind::PermissionDenied) {
        return CliError::new(PERMISSION_DENIED, format!("{context}: {err}"));
    }
    match err {
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ChecksumMismatch { .. }
        | FrameError::MalformedMessage { .. }
        | FrameError::FieldOutOfRange { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
    }
}

pub fn link_error(context: &str, err: LinkError) -> CliError {
    match err {
        LinkError::Transport(err) => transport_error(context, err),
        LinkError::Frame(err) => frame_error(context, err),
        LinkError::Io(err) => io_error(context, err),
        LinkError::PayloadTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        LinkError::InvalidConfig(_) => CliError::new(USAGE, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_errors_map_to_exit_codes() {
        let err = link_error(
            "send failed",
            LinkError::PayloadTooLarge { size: 200, max: 128 },
        );
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.starts_with("send failed: "));

        let err = link_error(
            "receive failed",
            LinkError::Frame(FrameError::ChecksumMismatch {
                received: 1,
                computed: 2,
            }),
        );
        assert_eq!(err.code, DATA_INVALID);

        let err = link_error("open failed", LinkError::InvalidConfig("bad".into()));
        assert_eq!(err.code, USAGE);

        let err = link_error(
            "receive failed",
            LinkError::Frame(FrameError::ConnectionClosed),
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
    }

    #[test]
    fn io_kinds_map_to_exit_codes() {
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(io_error("x", denied).code, PERMISSION_DENIED);

        let timed_out = io::Error::from(io::ErrorKind::TimedOut);
        assert_eq!(link_error("x", LinkError::Io(timed_out)).code, TIMEOUT);

        let other = io::Error::other("boom");
        assert_eq!(io_error("x", other).code, INTERNAL);
    }
}
