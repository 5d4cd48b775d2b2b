//! Fixed-header application messages carried inside frames.

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Message header: command (2) + id (1) + fragments (2) + fragment (2) + length (2).
pub const HEADER_LEN: usize = 9;

/// Largest payload the 16-bit length field can describe.
pub const MAX_MESSAGE_PAYLOAD: usize = u16::MAX as usize;

/// Positive acknowledgement.
pub const ACK: u16 = 0x01;
/// Negative acknowledgement.
pub const NAK: u16 = 0x02;
/// Liveness probe; the device echoes it with the same id.
pub const PING: u16 = 0x03;
/// Application-defined payload.
pub const RAW: u16 = 0x04;

/// Protocol-level message kind.
///
/// Codes without a symbolic meaning are carried as [`Command::Other`] so
/// that any 16-bit value survives a decode/encode round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Ack,
    Nak,
    Ping,
    Raw,
    Other(u16),
}

impl Command {
    /// Wire value of this command.
    pub const fn code(self) -> u16 {
        match self {
            Command::Ack => ACK,
            Command::Nak => NAK,
            Command::Ping => PING,
            Command::Raw => RAW,
            Command::Other(code) => code,
        }
    }

    /// Human-readable name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Command::Ack => "ACK",
            Command::Nak => "NAK",
            Command::Ping => "PING",
            Command::Raw => "RAW",
            Command::Other(_) => "OTHER",
        }
    }
}

impl From<u16> for Command {
    fn from(code: u16) -> Self {
        match code {
            ACK => Command::Ack,
            NAK => Command::Nak,
            PING => Command::Ping,
            RAW => Command::Raw,
            other => Command::Other(other),
        }
    }
}

impl From<Command> for u16 {
    fn from(command: Command) -> Self {
        command.code()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Other(code) => write!(f, "{code:#06x}"),
            known => f.write_str(known.name()),
        }
    }
}

/// An application message.
///
/// The wire `length` field is not stored; it is always the payload length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub command: Command,
    /// Correlates a response with its request.
    pub id: u8,
    /// Total number of fragments of the logical message.
    pub fragments: u16,
    /// Zero-based index of this fragment.
    pub fragment: u16,
    pub payload: Bytes,
}

impl Message {
    /// Create a single-fragment message.
    pub fn new(command: impl Into<Command>, id: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            command: command.into(),
            id,
            fragments: 1,
            fragment: 0,
            payload: payload.into(),
        }
    }

    /// Create an empty ping with the given correlation id.
    pub fn ping(id: u8) -> Self {
        Self::new(Command::Ping, id, Bytes::new())
    }

    /// Set the fragment position of this message.
    pub fn with_fragment(mut self, fragment: u16, fragments: u16) -> Self {
        self.fragment = fragment;
        self.fragments = fragments;
        self
    }

    /// Build a message from unchecked integers, validating each field
    /// against its wire width.
    pub fn from_fields(
        command: u32,
        id: u32,
        fragments: u32,
        fragment: u32,
        payload: impl Into<Bytes>,
    ) -> Result<Self> {
        let message = Self {
            command: checked_u16("command", command)?.into(),
            id: u8::try_from(id).map_err(|_| FrameError::FieldOutOfRange {
                field: "id",
                value: u64::from(id),
                max: u64::from(u8::MAX),
            })?,
            fragments: checked_u16("fragments", fragments)?,
            fragment: checked_u16("fragment", fragment)?,
            payload: payload.into(),
        };
        message.checked_length()?;
        Ok(message)
    }

    /// Payload length as carried in the header.
    pub fn length(&self) -> usize {
        self.payload.len()
    }

    /// Encoded size of this message (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    /// Serialize into `dst`.
    ///
    /// Wire format (little-endian):
    /// ```text
    /// ┌──────────┬────┬───────────┬──────────┬────────┬─────────────┐
    /// │ command  │ id │ fragments │ fragment │ length │ payload     │
    /// │ 2B       │ 1B │ 2B        │ 2B       │ 2B     │ length B    │
    /// └──────────┴────┴───────────┴──────────┴────────┴─────────────┘
    /// ```
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        let length = self.checked_length()?;
        dst.reserve(self.wire_size());
        dst.put_u16_le(self.command.code());
        dst.put_u8(self.id);
        dst.put_u16_le(self.fragments);
        dst.put_u16_le(self.fragment);
        dst.put_u16_le(length);
        dst.put_slice(&self.payload);
        Ok(())
    }

    /// Serialize into a freshly allocated buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut dst = BytesMut::new();
        self.encode(&mut dst)?;
        Ok(dst.freeze())
    }

    /// Deserialize a message from a frame payload.
    ///
    /// Fails if `src` is shorter than the header or than the header plus
    /// the declared payload length. Bytes past the payload are ignored.
    pub fn decode(src: &Bytes) -> Result<Self> {
        if src.len() < HEADER_LEN {
            return Err(FrameError::MalformedMessage {
                needed: HEADER_LEN,
                available: src.len(),
            });
        }

        let mut header = &src[..HEADER_LEN];
        let command = header.get_u16_le();
        let id = header.get_u8();
        let fragments = header.get_u16_le();
        let fragment = header.get_u16_le();
        let length = usize::from(header.get_u16_le());

        let needed = HEADER_LEN + length;
        if src.len() < needed {
            return Err(FrameError::MalformedMessage {
                needed,
                available: src.len(),
            });
        }

        Ok(Self {
            command: command.into(),
            id,
            fragments,
            fragment,
            payload: src.slice(HEADER_LEN..needed),
        })
    }

    fn checked_length(&self) -> Result<u16> {
        u16::try_from(self.payload.len()).map_err(|_| FrameError::FieldOutOfRange {
            field: "length",
            value: self.payload.len() as u64,
            max: MAX_MESSAGE_PAYLOAD as u64,
        })
    }
}

fn checked_u16(field: &'static str, value: u32) -> Result<u16> {
    u16::try_from(value).map_err(|_| FrameError::FieldOutOfRange {
        field,
        value: u64::from(value),
        max: u64::from(u16::MAX),
    })
}
