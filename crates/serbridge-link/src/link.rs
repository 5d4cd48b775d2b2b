use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use serbridge_frame::{encode_frame, FrameError, FrameReader, Message};
use serbridge_transport::SerialStream;
use tracing::{debug, info, trace, warn};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// What [`Link::send`] puts on the wire.
#[derive(Debug, Clone, Copy)]
pub enum Outgoing<'a> {
    /// Bytes framed as-is.
    Raw(&'a [u8]),
    /// A message, serialized before framing.
    Message(&'a Message),
}

impl Outgoing<'_> {
    /// Length of the payload checked against the link's limit.
    pub fn payload_len(&self) -> usize {
        match self {
            Outgoing::Raw(bytes) => bytes.len(),
            Outgoing::Message(message) => message.payload.len(),
        }
    }
}

impl<'a> From<&'a [u8]> for Outgoing<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Outgoing::Raw(bytes)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Outgoing<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        Outgoing::Raw(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for Outgoing<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Outgoing::Raw(bytes)
    }
}

impl<'a> From<&'a Bytes> for Outgoing<'a> {
    fn from(bytes: &'a Bytes) -> Self {
        Outgoing::Raw(bytes)
    }
}

impl<'a> From<&'a Message> for Outgoing<'a> {
    fn from(message: &'a Message) -> Self {
        Outgoing::Message(message)
    }
}

/// A framed, bidirectional connection to a device.
///
/// Frames decoded ahead of the caller stay queued inside the link and are
/// handed out by later `receive` calls in wire order.
pub struct Link<S> {
    reader: FrameReader<S>,
    wire: BytesMut,
    max_payload: usize,
}

impl<S: Read + Write> Link<S> {
    /// Wrap an already open stream.
    pub fn new(stream: S, config: &LinkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            reader: FrameReader::with_config(stream, config.frame_config()),
            wire: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            max_payload: config.max_payload,
        })
    }

    /// Frame and write one payload or message.
    ///
    /// Returns the number of bytes the stream accepted, which may be less
    /// than the frame length. Oversized payloads are rejected before
    /// anything is written.
    pub fn send<'a>(&mut self, outgoing: impl Into<Outgoing<'a>>) -> Result<usize> {
        let outgoing = outgoing.into();
        let size = outgoing.payload_len();
        if size > self.max_payload {
            return Err(LinkError::PayloadTooLarge {
                size,
                max: self.max_payload,
            });
        }

        self.wire.clear();
        match outgoing {
            Outgoing::Raw(bytes) => encode_frame(bytes, true, &mut self.wire),
            Outgoing::Message(message) => {
                let body = message.to_bytes()?;
                encode_frame(&body, true, &mut self.wire);
            }
        }

        let stream = self.reader.get_mut();
        let written = loop {
            match stream.write(&self.wire) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(LinkError::Io(err)),
            }
        };
        loop {
            match stream.flush() {
                Ok(()) => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(LinkError::Io(err)),
            }
        }

        if written < self.wire.len() {
            warn!(written, frame_len = self.wire.len(), "short write");
        } else {
            trace!(payload_len = size, written, "sent frame");
        }
        Ok(written)
    }

    /// Receive the next frame payload.
    ///
    /// Returns `Ok(None)` if nothing arrived within `timeout`; `None` blocks
    /// until a frame arrives or the stream fails. A frame that fails
    /// checksum verification is returned as an error for which
    /// [`LinkError::is_checksum_mismatch`] holds; the link stays usable.
    pub fn receive(&mut self, timeout: Option<Duration>) -> Result<Option<Bytes>> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        match self.reader.read_frame_until(deadline) {
            Ok(frame) => Ok(frame),
            Err(err @ FrameError::ChecksumMismatch { .. }) => {
                warn!(error = %err, "checksum failure on received frame");
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Receive the next frame and decode it as a [`Message`].
    ///
    /// A frame that does not hold a well-formed message yields `Ok(None)`.
    pub fn receive_message(&mut self, timeout: Option<Duration>) -> Result<Option<Message>> {
        let Some(frame) = self.receive(timeout)? else {
            return Ok(None);
        };
        match Message::decode(&frame) {
            Ok(message) => Ok(Some(message)),
            Err(err) => {
                debug!(error = %err, len = frame.len(), "frame is not a message");
                Ok(None)
            }
        }
    }

    /// Largest payload `send` accepts.
    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Whether received frames must carry a valid checksum.
    pub fn require_crc(&self) -> bool {
        self.reader.config().require_crc
    }

    /// Number of decoded frames waiting to be received.
    pub fn pending(&self) -> usize {
        self.reader.pending()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &S {
        self.reader.get_ref()
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        self.reader.get_mut()
    }

    /// Consume the link and return the stream. Queued frames are dropped.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}

impl Link<SerialStream> {
    /// Open a serial port and wrap it in a link.
    pub fn open(port: &str, config: &LinkConfig) -> Result<Self> {
        config.validate()?;
        let stream = SerialStream::open(port, &config.serial)?;
        info!(
            port,
            baud_rate = config.serial.baud_rate,
            require_crc = config.require_crc,
            max_payload = config.max_payload,
            "link opened"
        );
        Self::new(stream, config)
    }

    /// Name of the port behind this link.
    pub fn port_name(&self) -> &str {
        self.get_ref().name()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use serbridge_frame::{encode_to_bytes, Command, HEADER_LEN};

    use super::*;

    /// Scripted stream: reads come from `incoming`, writes land in `written`.
    struct Scripted {
        incoming: Cursor<Vec<u8>>,
        written: Vec<u8>,
        accept: Option<usize>,
    }

    impl Scripted {
        fn new(incoming: Vec<u8>) -> Self {
            Self {
                incoming: Cursor::new(incoming),
                written: Vec::new(),
                accept: None,
            }
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.incoming.read(buf)?;
            if n == 0 {
                // Behave like a serial port with nothing to deliver.
                return Err(std::io::Error::from(ErrorKind::TimedOut));
            }
            Ok(n)
        }
    }

    impl Write for Scripted {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let n = self.accept.map_or(buf.len(), |limit| limit.min(buf.len()));
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn link(incoming: Vec<u8>, config: LinkConfig) -> Link<Scripted> {
        Link::new(Scripted::new(incoming), &config).unwrap()
    }

    fn crc_config() -> LinkConfig {
        LinkConfig {
            require_crc: true,
            ..LinkConfig::default()
        }
    }

    #[test]
    fn send_raw_writes_escaped_frame() {
        let mut link = link(Vec::new(), LinkConfig::default());
        let written = link.send(b"hi").unwrap();

        assert_eq!(written, 7);
        assert_eq!(
            link.get_ref().written,
            [0x7E, 0x68, 0x69, 0x7D, 0x35, 0x5A, 0x7E]
        );
    }

    #[test]
    fn send_message_serializes_first() {
        let mut link = link(Vec::new(), LinkConfig::default());
        link.send(&Message::ping(0x2A)).unwrap();

        assert_eq!(
            link.get_ref().written,
            [
                0x7E, 0x7D, 0x23, 0x7D, 0x20, 0x2A, 0x7D, 0x21, 0x7D, 0x20, 0x7D, 0x20, 0x7D,
                0x20, 0x7D, 0x20, 0x7D, 0x20, 0x7D, 0x3F, 0xE9, 0x7E
            ]
        );
    }

    #[test]
    fn send_rejects_oversized_payload() {
        let config = LinkConfig {
            max_payload: 4,
            ..LinkConfig::default()
        };
        let mut link = link(Vec::new(), config);

        let err = link.send(b"12345").unwrap_err();
        assert!(matches!(err, LinkError::PayloadTooLarge { size: 5, max: 4 }));

        // The limit applies to the message payload, not the header.
        let message = Message::new(Command::Raw, 1, Bytes::from_static(b"12345"));
        assert!(matches!(
            link.send(&message),
            Err(LinkError::PayloadTooLarge { size: 5, max: 4 })
        ));
        assert!(link.get_ref().written.is_empty());

        let message = Message::new(Command::Raw, 1, Bytes::from_static(b"1234"));
        assert!(link.send(&message).unwrap() > HEADER_LEN + 4);
    }

    #[test]
    fn send_reports_short_write() {
        let mut stream = Scripted::new(Vec::new());
        stream.accept = Some(3);
        let mut link = Link::new(stream, &LinkConfig::default()).unwrap();

        assert_eq!(link.send(b"hello").unwrap(), 3);
    }

    #[test]
    fn receive_returns_frames_in_order() {
        let mut wire = encode_to_bytes(b"one", true).to_vec();
        wire.extend_from_slice(&encode_to_bytes(b"two", true));
        let mut link = link(wire, crc_config());

        let timeout = Some(Duration::from_millis(50));
        assert_eq!(link.receive(timeout).unwrap().as_deref(), Some(&b"one"[..]));
        assert_eq!(link.pending(), 1);
        assert_eq!(link.receive(timeout).unwrap().as_deref(), Some(&b"two"[..]));
        assert!(link.receive(timeout).unwrap().is_none());
    }

    #[test]
    fn receive_times_out_without_data() {
        let mut link = link(Vec::new(), LinkConfig::default());
        let started = Instant::now();
        assert!(link
            .receive(Some(Duration::from_millis(20)))
            .unwrap()
            .is_none());
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn receive_surfaces_checksum_failure() {
        let mut wire = encode_to_bytes(b"bad", true).to_vec();
        wire[2] ^= 0x01;
        wire.extend_from_slice(&encode_to_bytes(b"good", true));
        let mut link = link(wire, crc_config());

        let timeout = Some(Duration::from_millis(50));
        let err = link.receive(timeout).unwrap_err();
        assert!(err.is_checksum_mismatch());
        assert_eq!(link.receive(timeout).unwrap().as_deref(), Some(&b"good"[..]));
    }

    #[test]
    fn receive_without_crc_check_accepts_corrupt_frame() {
        let mut wire = encode_to_bytes(b"bad", true).to_vec();
        wire[2] ^= 0x01;
        let mut link = link(wire, LinkConfig::default());

        let frame = link.receive(Some(Duration::from_millis(50))).unwrap();
        assert_eq!(frame.as_deref(), Some(&b"b`d"[..]));
    }

    #[test]
    fn receive_message_decodes_reply() {
        let reply = Message::new(Command::Ack, 9, Bytes::from_static(b"ok"));
        let wire = encode_to_bytes(&reply.to_bytes().unwrap(), true).to_vec();
        let mut link = link(wire, crc_config());

        let message = link
            .receive_message(Some(Duration::from_millis(50)))
            .unwrap();
        assert_eq!(message, Some(reply));
    }

    #[test]
    fn receive_message_maps_malformed_to_none() {
        let mut wire = encode_to_bytes(b"short", true).to_vec();
        wire.extend_from_slice(&encode_to_bytes(
            &Message::ping(3).to_bytes().unwrap(),
            true,
        ));
        let mut link = link(wire, LinkConfig::default());

        let timeout = Some(Duration::from_millis(50));
        assert!(link.receive_message(timeout).unwrap().is_none());
        let next = link.receive_message(timeout).unwrap().unwrap();
        assert_eq!(next.command, Command::Ping);
        assert_eq!(next.id, 3);
    }

    #[test]
    fn message_larger_than_send_limit_is_received_whole() {
        let message = Message::new(Command::Raw, 9, vec![0x41; 200]);
        let wire = encode_to_bytes(&message.to_bytes().unwrap(), true).to_vec();
        let mut link = link(wire, LinkConfig::default());

        let received = link
            .receive_message(Some(Duration::from_millis(50)))
            .unwrap()
            .expect("full message");
        assert_eq!(received, message);
        assert_eq!(received.payload.len(), 200);
    }

    #[test]
    fn oversized_incoming_frame_is_discarded() {
        // 4200 + 2 CRC bytes: the first 4097 are discarded, the 105-byte
        // tail is finalized on its own and fails the checksum.
        let mut wire = encode_to_bytes(&[0x41; 4200], true).to_vec();
        wire.extend_from_slice(&encode_to_bytes(b"ok", true));
        let mut link = link(wire, crc_config());

        let err = link.receive(Some(Duration::from_millis(50))).unwrap_err();
        assert!(err.is_checksum_mismatch());
        let frame = link.receive(Some(Duration::from_millis(50))).unwrap();
        assert_eq!(frame.as_deref(), Some(&b"ok"[..]));
    }

    #[test]
    fn eof_is_an_error() {
        let mut link = Link::new(Cursor::new(Vec::<u8>::new()), &LinkConfig::default()).unwrap();
        let err = link.receive(None).unwrap_err();
        assert!(err.is_closed());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = LinkConfig {
            max_payload: 0,
            ..LinkConfig::default()
        };
        assert!(matches!(
            Link::new(Cursor::new(Vec::<u8>::new()), &config),
            Err(LinkError::InvalidConfig(_))
        ));
    }

    #[test]
    #[cfg(unix)]
    fn echo_over_socket_pair() {
        use std::os::unix::net::UnixStream;
        use std::thread;

        let (host, device) = UnixStream::pair().unwrap();
        let echo = thread::spawn(move || {
            let mut device = Link::new(device, &crc_config()).unwrap();
            let message = device.receive_message(None).unwrap().unwrap();
            device.send(&message).unwrap();
        });

        let mut link = Link::new(host, &crc_config()).unwrap();
        let request = Message::new(Command::Raw, 7, Bytes::from_static(b"relay on"));
        link.send(&request).unwrap();
        let reply = link
            .receive_message(Some(Duration::from_secs(5)))
            .unwrap();
        assert_eq!(reply, Some(request));

        echo.join().unwrap();
    }
}
