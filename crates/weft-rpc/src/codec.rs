//! Length-prefixed frame codec, shared by the internal RPC transport and
//! the client-facing framed-TCP protocol.
//!
//! Wire layout: `version(2B, BE) | length(2B, BE, total packet length) |
//! payload(length - 4 bytes)`.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// Current framing version.
pub const FRAME_VERSION: u16 = 1;

/// Bytes of header before the payload.
pub const HEADER_LEN: usize = 4;

/// Largest payload a frame can carry (the length field is 16-bit and counts
/// the header).
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize - HEADER_LEN;

/// One framed packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub version: u16,
    pub payload: Bytes,
}

impl Frame {
    #[must_use]
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            version: FRAME_VERSION,
            payload: payload.into(),
        }
    }
}

/// Codec for [`Frame`]s over a byte stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, io::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let version = u16::from_be_bytes([src[0], src[1]]);
        let total = usize::from(u16::from_be_bytes([src[2], src[3]]));

        if total < HEADER_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame length {total} shorter than header"),
            ));
        }

        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut packet = src.split_to(total);
        packet.advance(HEADER_LEN);

        Ok(Some(Frame {
            version,
            payload: packet.freeze(),
        }))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), io::Error> {
        if frame.payload.len() > MAX_PAYLOAD_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("payload of {} bytes exceeds frame limit", frame.payload.len()),
            ));
        }

        let total = (frame.payload.len() + HEADER_LEN) as u16;
        dst.reserve(usize::from(total));
        dst.put_u16(frame.version);
        dst.put_u16(total);
        dst.extend_from_slice(&frame.payload);
        Ok(())
    }
}
