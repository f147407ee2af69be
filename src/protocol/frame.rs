//! Frame wrapping and unwrapping over [`TransportBuffer`]s.
//!
//! Outbound frames are always final, masked and binary: one WebSocket message
//! per chunk of AMQP bytes, never text, continuation or fragmented frames.
//! Inbound frames are classified from their header alone so a caller can
//! route the payload before it has fully arrived.

use crate::buffer::TransportBuffer;
use crate::error::{Error, Result};
use crate::protocol::OpCode;
use crate::protocol::header::{
    FINBIT_MASK, FrameHeader, MASKBIT_MASK, OPCODE_PONG, PAYLOAD_EXTENDED_16,
    PAYLOAD_EXTENDED_64, PAYLOAD_LARGE_MAX, PAYLOAD_MEDIUM_MAX, PAYLOAD_SHORT_MAX, header_size,
};
use crate::protocol::mask::{MASKING_KEY_LEN, apply_mask, random_masking_key};

/// How an inbound frame should be routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Binary frame: payload is AMQP bytes.
    Amqp,
    Ping,
    Pong,
    Close,
    /// Opcode this layer does not carry (text, continuation, reserved).
    Invalid,
    /// Header not yet complete; retry once more bytes arrive.
    InvalidLength,
    /// Nothing buffered.
    Empty,
}

/// Result of [`unwrap`]: the classification plus what the header said.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unwrapped {
    pub kind: MessageKind,
    /// Header bytes removed from the front of the buffer (0 if none were).
    pub header_len: usize,
    pub payload_len: u64,
    /// Present if the peer masked the frame; the payload is left masked.
    pub masking_key: Option<[u8; MASKING_KEY_LEN]>,
}

impl Unwrapped {
    const fn bare(kind: MessageKind) -> Self {
        Self {
            kind,
            header_len: 0,
            payload_len: 0,
            masking_key: None,
        }
    }
}

/// Wrap `payload` in a final, masked, binary frame appended to `dst`.
///
/// An empty payload writes nothing. A fresh random masking key is drawn for
/// every frame.
///
/// # Errors
///
/// - [`Error::InsufficientCapacity`] if `dst` cannot hold the whole frame
/// - [`Error::PayloadTooLarge`] if `payload` exceeds the 32-bit length limit
/// - [`Error::Entropy`] if no masking key could be drawn
pub fn wrap(payload: &[u8], dst: &mut TransportBuffer) -> Result<()> {
    if payload.is_empty() {
        return Ok(());
    }
    wrap_with_key(payload, dst, random_masking_key()?)
}

/// [`wrap`] with a caller-chosen masking key.
///
/// # Errors
///
/// As [`wrap`], minus the entropy failure.
pub fn wrap_with_key(
    payload: &[u8],
    dst: &mut TransportBuffer,
    key: [u8; MASKING_KEY_LEN],
) -> Result<()> {
    if payload.is_empty() {
        return Ok(());
    }
    encode(OpCode::Binary, payload, dst, key)
}

/// Append a final, masked frame with the given opcode to `dst`.
///
/// # Errors
///
/// - [`Error::InsufficientCapacity`] if `dst` cannot hold the whole frame
/// - [`Error::PayloadTooLarge`] if `payload` exceeds the 32-bit length limit
pub fn encode(
    opcode: OpCode,
    payload: &[u8],
    dst: &mut TransportBuffer,
    key: [u8; MASKING_KEY_LEN],
) -> Result<()> {
    let payload_len = payload.len();
    if payload_len > PAYLOAD_LARGE_MAX {
        return Err(Error::PayloadTooLarge {
            size: payload_len as u64,
            max: PAYLOAD_LARGE_MAX as u64,
        });
    }

    let header_len = header_size(payload_len);
    let total = header_len + payload_len;
    if dst.remaining_mut() < total {
        return Err(Error::InsufficientCapacity {
            needed: total,
            available: dst.remaining_mut(),
        });
    }

    let out = &mut dst.spare_mut()[..total];
    out[0] = FINBIT_MASK | opcode.as_u8();

    let mut offset = 2;
    if payload_len <= PAYLOAD_SHORT_MAX {
        out[1] = MASKBIT_MASK | payload_len as u8;
    } else if payload_len <= PAYLOAD_MEDIUM_MAX {
        out[1] = MASKBIT_MASK | PAYLOAD_EXTENDED_16;
        out[2..4].copy_from_slice(&(payload_len as u16).to_be_bytes());
        offset += 2;
    } else {
        out[1] = MASKBIT_MASK | PAYLOAD_EXTENDED_64;
        out[2..6].fill(0);
        out[6..10].copy_from_slice(&(payload_len as u32).to_be_bytes());
        offset += 8;
    }

    out[offset..offset + MASKING_KEY_LEN].copy_from_slice(&key);
    offset += MASKING_KEY_LEN;

    let body = &mut out[offset..];
    body.copy_from_slice(payload);
    apply_mask(body, key);

    dst.advance(total)?;
    tracing::trace!(%opcode, payload_len, header_len, "wrapped frame");
    Ok(())
}

/// Classify the frame at the front of `buf` and strip its header.
///
/// Only the header needs to be present. On success the header (including any
/// masking key) is removed and the payload starts at offset 0 of `buf`. If the
/// header is incomplete the result is [`MessageKind::InvalidLength`] and
/// nothing is consumed. Frames with an opcode this layer does not carry, or
/// with header bits it does not accept, are reported as
/// [`MessageKind::Invalid`] and left in place.
pub fn unwrap(buf: &mut TransportBuffer) -> Unwrapped {
    if buf.is_empty() {
        return Unwrapped::bare(MessageKind::Empty);
    }

    let Some((header, header_len)) = FrameHeader::parse(buf.readable()) else {
        return Unwrapped::bare(MessageKind::InvalidLength);
    };

    // No extension is negotiated, and control frames cannot be fragmented.
    let opcode = OpCode::from_u8(header.opcode)
        .filter(|op| header.rsv == 0 && (header.fin || !op.is_control()));
    let kind = match opcode {
        Some(OpCode::Binary) => MessageKind::Amqp,
        Some(OpCode::Ping) => MessageKind::Ping,
        Some(OpCode::Pong) => MessageKind::Pong,
        Some(OpCode::Close) => MessageKind::Close,
        _ => return Unwrapped::bare(MessageKind::Invalid),
    };

    buf.consume(header_len);
    tracing::trace!(
        ?kind,
        header_len,
        payload_len = header.payload_length,
        "unwrapped frame header"
    );

    Unwrapped {
        kind,
        header_len,
        payload_len: header.payload_length,
        masking_key: header.masking_key,
    }
}

/// Copy a raw ping frame into `pong` and turn it into a pong.
///
/// The first header byte is rewritten to `FIN | PONG`; everything else is
/// copied verbatim. An empty `ping` leaves `pong` empty.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `pong` has less capacity than `ping`.
pub fn create_pong(ping: &TransportBuffer, pong: &mut TransportBuffer) -> Result<()> {
    if pong.capacity() < ping.capacity() {
        return Err(Error::InvalidArgument(format!(
            "pong buffer capacity {} is smaller than ping buffer capacity {}",
            pong.capacity(),
            ping.capacity()
        )));
    }

    pong.clear();
    if ping.is_empty() {
        return Ok(());
    }

    pong.put(ping.readable())?;
    pong.readable_mut()[0] = FINBIT_MASK | OPCODE_PONG;
    Ok(())
}
