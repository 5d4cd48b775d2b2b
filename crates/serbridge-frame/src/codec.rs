use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::crc::crc16;
use crate::error::{FrameError, Result};

/// Frame delimiter.
pub const FLAG: u8 = 0x7E;

/// Escape prefix for reserved bytes.
pub const ESC: u8 = 0x7D;

/// XOR mask applied to an escaped byte.
pub const ESC_MASK: u8 = 0x20;

/// Trailing CRC length in bytes.
pub const CRC_LEN: usize = 2;

/// Default maximum un-stuffed frame body the deframer accumulates.
pub const DEFAULT_MAX_FRAME_LEN: usize = 4096;

/// Configuration for the frame codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    /// Escape every byte below 0x20 in addition to FLAG and ESC.
    pub escape_ctrl: bool,
    /// Verify the trailing CRC of every received frame.
    pub require_crc: bool,
    /// Longest un-stuffed body (payload + CRC) accepted before the
    /// accumulation buffer is discarded.
    pub max_frame_len: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            escape_ctrl: true,
            require_crc: false,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

fn needs_escape(byte: u8, escape_ctrl: bool) -> bool {
    byte == FLAG || byte == ESC || (escape_ctrl && byte < 0x20)
}

fn put_stuffed(dst: &mut BytesMut, byte: u8, escape_ctrl: bool) {
    if needs_escape(byte, escape_ctrl) {
        dst.put_u8(ESC);
        dst.put_u8(byte ^ ESC_MASK);
    } else {
        dst.put_u8(byte);
    }
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬──────────────────────────────────────┬──────┐
/// │ 0x7E │ stuffed(payload ++ CRC16 LE)          │ 0x7E │
/// └──────┴──────────────────────────────────────┴──────┘
/// ```
///
/// FLAG and ESC (and control bytes when `escape_ctrl` is set) are sent as
/// `ESC, byte ^ 0x20`. Encoding never fails.
pub fn encode_frame(payload: &[u8], escape_ctrl: bool, dst: &mut BytesMut) {
    let fcs = crc16(payload).to_le_bytes();
    // Worst case every byte is escaped.
    dst.reserve(2 + 2 * (payload.len() + CRC_LEN));
    dst.put_u8(FLAG);
    for &byte in payload.iter().chain(fcs.iter()) {
        put_stuffed(dst, byte, escape_ctrl);
    }
    dst.put_u8(FLAG);
}

/// Encode a payload into a freshly allocated frame.
pub fn encode_to_bytes(payload: &[u8], escape_ctrl: bool) -> Bytes {
    let mut dst = BytesMut::new();
    encode_frame(payload, escape_ctrl, &mut dst);
    dst.freeze()
}

/// Streaming frame decoder.
///
/// Feed it arbitrary chunks of the incoming byte stream; it carries partial
/// frames between calls and yields every frame completed by the chunk, in
/// wire order. Frames with an un-stuffed body shorter than the CRC are
/// dropped silently, as is anything longer than `max_frame_len`. In
/// `require_crc` mode a frame whose CRC does not verify is yielded as
/// [`FrameError::ChecksumMismatch`].
#[derive(Debug)]
pub struct Deframer {
    buf: BytesMut,
    escaped: bool,
    config: FrameConfig,
}

impl Default for Deframer {
    fn default() -> Self {
        Self::new(FrameConfig::default())
    }
}

impl Deframer {
    pub fn new(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(config.max_frame_len.min(DEFAULT_MAX_FRAME_LEN)),
            escaped: false,
            config,
        }
    }

    /// Consume a chunk and return the outcome of every frame it completes.
    pub fn input(&mut self, data: &[u8]) -> Vec<Result<Bytes>> {
        let mut out = Vec::new();
        for &byte in data {
            if byte == FLAG {
                if !self.buf.is_empty() {
                    if let Some(outcome) = self.finalize() {
                        out.push(outcome);
                    }
                }
                self.buf.clear();
                self.escaped = false;
                continue;
            }

            let byte = if self.escaped {
                self.escaped = false;
                byte ^ ESC_MASK
            } else if byte == ESC {
                self.escaped = true;
                continue;
            } else {
                byte
            };

            if self.buf.len() < self.config.max_frame_len {
                self.buf.put_u8(byte);
            } else {
                debug!(
                    max = self.config.max_frame_len,
                    "frame exceeds maximum length; discarding"
                );
                self.buf.clear();
                self.escaped = false;
            }
        }
        out
    }

    /// Drop any partially accumulated frame.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.escaped = false;
    }

    /// Bytes accumulated since the last FLAG.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn finalize(&mut self) -> Option<Result<Bytes>> {
        if self.buf.len() < CRC_LEN {
            trace!(len = self.buf.len(), "dropping runt frame");
            return None;
        }

        let body = self.buf.split().freeze();
        let split = body.len() - CRC_LEN;
        let received = u16::from_le_bytes([body[split], body[split + 1]]);
        let payload = body.slice(..split);

        if self.config.require_crc {
            let computed = crc16(&payload);
            if computed != received {
                return Some(Err(FrameError::ChecksumMismatch { received, computed }));
            }
        }
        Some(Ok(payload))
    }
}
