use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::time::Instant;

use bytes::Bytes;
use tracing::trace;

use crate::codec::{Deframer, FrameConfig};
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally and keeps every frame decoded from a
/// chunk, so frames that arrive together are handed out one per call, in
/// wire order. Checksum failures keep their position in that order.
pub struct FrameReader<T> {
    inner: T,
    deframer: Deframer,
    pending: VecDeque<Result<Bytes>>,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            deframer: Deframer::new(config),
            pending: VecDeque::new(),
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Read timeouts of the underlying stream are returned as
    /// `FrameError::Io`; EOF is `FrameError::ConnectionClosed`.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        loop {
            if let Some(next) = self.pending.pop_front() {
                return next;
            }
            match self.fill()? {
                Fill::Data => {}
                Fill::Idle => {
                    return Err(FrameError::Io(std::io::Error::from(ErrorKind::TimedOut)))
                }
            }
        }
    }

    /// Read the next complete frame, giving up once `deadline` has passed.
    ///
    /// Returns `Ok(None)` on timeout. Without a deadline this blocks until a
    /// frame arrives or the stream fails. The deadline is checked between
    /// reads, so it is honored to within the stream's own read timeout.
    pub fn read_frame_until(&mut self, deadline: Option<Instant>) -> Result<Option<Bytes>> {
        loop {
            if let Some(next) = self.pending.pop_front() {
                return next.map(Some);
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Ok(None);
            }
            self.fill()?;
        }
    }

    /// Number of decoded frames waiting to be handed out.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        self.deframer.config()
    }

    fn fill(&mut self) -> Result<Fill> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let read = loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Ok(Fill::Idle)
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        };

        trace!(bytes = read, "read chunk");
        self.pending.extend(self.deframer.input(&chunk[..read]));
        Ok(Fill::Data)
    }
}

enum Fill {
    Data,
    Idle,
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode_frame, encode_to_bytes};

    #[test]
    fn read_single_frame() {
        let wire = encode_to_bytes(b"hello", true);

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.as_ref(), b"hello");
    }

    #[test]
    fn read_multiple_frames() {
        let mut wire = BytesMut::new();
        encode_frame(b"one", true, &mut wire);
        encode_frame(b"two", true, &mut wire);
        encode_frame(b"three", true, &mut wire);

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));

        assert_eq!(reader.read_frame().unwrap().as_ref(), b"one");
        assert_eq!(reader.pending(), 2);
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"two");
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"three");
    }

    #[test]
    fn read_frame_with_large_payload() {
        let payload = vec![0x7E; 2048];
        let wire = encode_to_bytes(&payload, true);

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.as_ref(), payload.as_slice());
    }

    #[test]
    fn partial_read_handling() {
        let wire = encode_to_bytes(b"slow", true);

        let byte_reader = ByteByByteReader {
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        assert_eq!(reader.read_frame().unwrap().as_ref(), b"slow");
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let wire = encode_to_bytes(b"only-part", true);
        let mut reader = FrameReader::new(Cursor::new(wire[..5].to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn checksum_failure_is_returned_in_order() {
        let mut wire = encode_to_bytes(b"bad", true).to_vec();
        wire[1] ^= 0x01;
        wire.extend_from_slice(&encode_to_bytes(b"good", true));

        let cfg = FrameConfig {
            require_crc: true,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(wire), cfg);
        assert!(reader.read_frame().unwrap_err().is_checksum_mismatch());
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"good");
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            if buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        use std::io::Write;

        let (mut left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut reader = FrameReader::new(right);

        left.write_all(&encode_to_bytes(b"ping", true)).unwrap();
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"ping");
    }

    #[test]
    #[cfg(unix)]
    fn deadline_expires_without_data() {
        let (_left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        right
            .set_read_timeout(Some(Duration::from_millis(10)))
            .unwrap();
        let mut reader = FrameReader::new(right);

        let started = Instant::now();
        let frame = reader
            .read_frame_until(Some(started + Duration::from_millis(50)))
            .unwrap();
        assert!(frame.is_none());
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn past_deadline_still_returns_pending_frame() {
        let mut wire = BytesMut::new();
        encode_frame(b"a", true, &mut wire);
        encode_frame(b"b", true, &mut wire);
        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));

        assert_eq!(reader.read_frame().unwrap().as_ref(), b"a");
        let frame = reader.read_frame_until(Some(Instant::now())).unwrap();
        assert_eq!(frame.as_deref(), Some(&b"b"[..]));
        assert!(reader.read_frame_until(Some(Instant::now())).unwrap().is_none());
    }

    #[test]
    fn read_timeout_surfaces_as_io_error() {
        let reader = TimedOutThenData {
            state: 0,
            bytes: encode_to_bytes(b"ok", true).to_vec(),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let err = framed.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::TimedOut));
        assert_eq!(framed.read_frame().unwrap().as_ref(), b"ok");
    }

    #[test]
    fn timed_out_read_is_retried_until_deadline() {
        let reader = TimedOutThenData {
            state: 0,
            bytes: encode_to_bytes(b"late", true).to_vec(),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let frame = framed.read_frame_until(None).unwrap();
        assert_eq!(frame.as_deref(), Some(&b"late"[..]));
    }

    struct TimedOutThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for TimedOutThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::TimedOut));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            state: 0,
            bytes: encode_to_bytes(b"ok", true).to_vec(),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        assert_eq!(framed.read_frame().unwrap().as_ref(), b"ok");
    }

    struct InterruptedThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut reader = FrameReader::new(cursor);

        let _ = reader.get_ref();
        let _ = reader.get_mut();
        assert!(reader.config().escape_ctrl);
        let _inner = reader.into_inner();
    }
}
