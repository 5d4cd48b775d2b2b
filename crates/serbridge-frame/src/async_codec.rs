//! `tokio_util::codec` adapter over the frame codec.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_frame, Deframer, FrameConfig};
use crate::error::{FrameError, Result};

/// Frame codec for `FramedRead` / `FramedWrite`.
///
/// Each decoded item is the outcome of one frame, so a checksum failure in
/// `require_crc` mode is yielded as `Some(Err(..))` without ending the stream.
#[derive(Debug)]
pub struct HdlcCodec {
    deframer: Deframer,
    pending: VecDeque<Result<Bytes>>,
}

impl HdlcCodec {
    pub fn new(config: FrameConfig) -> Self {
        Self {
            deframer: Deframer::new(config),
            pending: VecDeque::new(),
        }
    }
}

impl Default for HdlcCodec {
    fn default() -> Self {
        Self::new(FrameConfig::default())
    }
}

impl Decoder for HdlcCodec {
    type Item = Result<Bytes>;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if self.pending.is_empty() && !src.is_empty() {
            let chunk = src.split();
            self.pending.extend(self.deframer.input(&chunk));
        }
        Ok(self.pending.pop_front())
    }
}

impl Encoder<Bytes> for HdlcCodec {
    type Error = FrameError;

    fn encode(&mut self, payload: Bytes, dst: &mut BytesMut) -> Result<()> {
        encode_frame(&payload, self.deframer.config().escape_ctrl, dst);
        Ok(())
    }
}
