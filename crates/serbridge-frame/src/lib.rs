//! HDLC-style link framing and the fixed-header message codec.
//!
//! This is the core value-add layer of serbridge. Every payload is framed as:
//! - A `0x7E` flag byte on each side
//! - Byte stuffing of `0x7E`, `0x7D` and (by default) control bytes
//! - A trailing CRC-16/X-25 in little-endian order
//!
//! The [`Deframer`] tolerates arbitrary chunk boundaries, so callers never
//! deal with partial reads. [`Message`] adds the 9-byte application header.

pub mod codec;
pub mod crc;
pub mod error;
pub mod message;
pub mod reader;

#[cfg(feature = "async")]
pub mod async_codec;

#[cfg(feature = "async")]
pub use async_codec::HdlcCodec;
pub use codec::{
    encode_frame, encode_to_bytes, Deframer, FrameConfig, CRC_LEN, DEFAULT_MAX_FRAME_LEN, ESC,
    ESC_MASK, FLAG,
};
pub use crc::crc16;
pub use error::{FrameError, Result};
pub use message::{Command, Message, HEADER_LEN, MAX_MESSAGE_PAYLOAD};
pub use reader::FrameReader;
