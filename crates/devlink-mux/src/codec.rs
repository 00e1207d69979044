use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{MuxError, Result};

/// Frame header: channel (1) + length (2) = 3 bytes.
pub const HEADER_SIZE: usize = 3;

/// Maximum payload a single frame can carry, bounded by the length field.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// A framed message with channel routing.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The channel this message belongs to.
    pub channel: u8,
    /// The message payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(channel: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            channel,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Encode a frame into wire format v1.
///
/// ```text
/// ┌──────────────┬─────────────┬──────────────────┐
/// │ Channel (1B) │ Length      │ Payload          │
/// │              │ (2B LE)     │ (Length bytes)   │
/// └──────────────┴─────────────┴──────────────────┘
/// ```
///
/// The link is assumed reliable and in-order (TCP, flow-controlled serial),
/// so the format carries no magic or checksum.
pub fn encode_frame(channel: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(MuxError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u8(channel);
    dst.put_u16_le(payload.len() as u16);
    dst.put_slice(payload);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet;
/// the header, the length field, and the payload may each arrive split
/// across reads. On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    let channel = src[0];
    let payload_len = u16::from_le_bytes([src[1], src[2]]) as usize;

    if payload_len > max_payload {
        return Err(MuxError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        return Ok(None); // Need more data
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(Frame { channel, payload }))
}

/// Configuration for framing and the mux built on it.
#[derive(Debug, Clone)]
pub struct MuxConfig {
    /// Maximum accepted payload size in bytes. Default: [`MAX_PAYLOAD`].
    pub max_payload_size: usize,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD,
        }
    }
}
