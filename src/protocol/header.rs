//! Frame header layout, constants and parsing (RFC 6455 Section 5.2).
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |     Extended payload length continued, if payload len == 127  |
//! + - - - - - - - - - - - - - - - +-------------------------------+
//! |                               | Masking-key, if MASK set to 1 |
//! +-------------------------------+-------------------------------+
//! | Masking-key (continued)       |          Payload Data         |
//! +-------------------------------- - - - - - - - - - - - - - - - +
//! ```

use crate::protocol::mask::MASKING_KEY_LEN;

pub const FINBIT_MASK: u8 = 0x80;
pub const RSV_MASK: u8 = 0x70;
pub const OPCODE_MASK: u8 = 0x0F;
pub const MASKBIT_MASK: u8 = 0x80;
pub const PAYLOAD_MASK: u8 = 0x7F;

pub const OPCODE_BINARY: u8 = 0x02;
pub const OPCODE_CLOSE: u8 = 0x08;
pub const OPCODE_PING: u8 = 0x09;
pub const OPCODE_PONG: u8 = 0x0A;

/// Length marker selecting the 16-bit extended length.
pub const PAYLOAD_EXTENDED_16: u8 = 126;
/// Length marker selecting the 64-bit extended length.
pub const PAYLOAD_EXTENDED_64: u8 = 127;

pub const PAYLOAD_SHORT_MAX: usize = 125;
pub const PAYLOAD_MEDIUM_MAX: usize = 65535;
/// Largest payload the codec encodes: the 64-bit length field only ever
/// carries a 32-bit value, its upper four bytes are always zero.
pub const PAYLOAD_LARGE_MAX: usize = u32::MAX as usize;

pub const MIN_HEADER_LENGTH: usize = 2;
pub const MED_HEADER_LENGTH: usize = 4;
pub const MAX_HEADER_LENGTH: usize = 10;

pub const MIN_HEADER_LENGTH_MASKED: usize = MIN_HEADER_LENGTH + MASKING_KEY_LEN;
pub const MED_HEADER_LENGTH_MASKED: usize = MED_HEADER_LENGTH + MASKING_KEY_LEN;
pub const MAX_HEADER_LENGTH_MASKED: usize = MAX_HEADER_LENGTH + MASKING_KEY_LEN;

/// Size of the header (including masking key) for a masked frame carrying
/// `payload_len` bytes.
#[inline]
#[must_use]
pub const fn header_size(payload_len: usize) -> usize {
    if payload_len <= PAYLOAD_SHORT_MAX {
        MIN_HEADER_LENGTH_MASKED
    } else if payload_len <= PAYLOAD_MEDIUM_MAX {
        MED_HEADER_LENGTH_MASKED
    } else {
        MAX_HEADER_LENGTH_MASKED
    }
}

/// Largest payload whose complete masked frame fits in `room` bytes.
#[must_use]
pub const fn max_payload_for(room: usize) -> usize {
    let payload = if room > MAX_HEADER_LENGTH_MASKED + PAYLOAD_MEDIUM_MAX {
        room - MAX_HEADER_LENGTH_MASKED
    } else if room > MED_HEADER_LENGTH_MASKED + PAYLOAD_SHORT_MAX {
        let p = room - MED_HEADER_LENGTH_MASKED;
        if p > PAYLOAD_MEDIUM_MAX { PAYLOAD_MEDIUM_MAX } else { p }
    } else {
        let p = room.saturating_sub(MIN_HEADER_LENGTH_MASKED);
        if p > PAYLOAD_SHORT_MAX { PAYLOAD_SHORT_MAX } else { p }
    };
    if payload > PAYLOAD_LARGE_MAX {
        PAYLOAD_LARGE_MAX
    } else {
        payload
    }
}

/// A decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub fin: bool,
    /// RSV1..RSV3, shifted down to the low three bits.
    pub rsv: u8,
    /// Raw 4-bit opcode; may be a reserved value.
    pub opcode: u8,
    pub masked: bool,
    pub payload_length: u64,
    pub masking_key: Option<[u8; MASKING_KEY_LEN]>,
}

impl FrameHeader {
    /// Encoded length of this header, including the masking key.
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        let base = if self.payload_length <= PAYLOAD_SHORT_MAX as u64 {
            MIN_HEADER_LENGTH
        } else if self.payload_length <= PAYLOAD_MEDIUM_MAX as u64 {
            MED_HEADER_LENGTH
        } else {
            MAX_HEADER_LENGTH
        };
        if self.masked {
            base + MASKING_KEY_LEN
        } else {
            base
        }
    }

    /// Parse a header from the front of `buf` without requiring the payload.
    ///
    /// Returns the header and the number of bytes it occupies, or `None` if
    /// `buf` does not yet hold the complete header. The top bit of a 64-bit
    /// length is not checked.
    #[must_use]
    pub fn parse(buf: &[u8]) -> Option<(Self, usize)> {
        if buf.len() < MIN_HEADER_LENGTH {
            return None;
        }

        let byte0 = buf[0];
        let byte1 = buf[1];
        let masked = byte1 & MASKBIT_MASK != 0;

        let (payload_length, len_end) = match byte1 & PAYLOAD_MASK {
            PAYLOAD_EXTENDED_16 => {
                if buf.len() < MED_HEADER_LENGTH {
                    return None;
                }
                (u64::from(u16::from_be_bytes([buf[2], buf[3]])), MED_HEADER_LENGTH)
            }
            PAYLOAD_EXTENDED_64 => {
                if buf.len() < MAX_HEADER_LENGTH {
                    return None;
                }
                let mut len = [0u8; 8];
                len.copy_from_slice(&buf[2..MAX_HEADER_LENGTH]);
                (u64::from_be_bytes(len), MAX_HEADER_LENGTH)
            }
            short => (u64::from(short), MIN_HEADER_LENGTH),
        };

        let header_len = if masked {
            len_end + MASKING_KEY_LEN
        } else {
            len_end
        };
        if buf.len() < header_len {
            return None;
        }

        let masking_key = masked.then(|| {
            [
                buf[len_end],
                buf[len_end + 1],
                buf[len_end + 2],
                buf[len_end + 3],
            ]
        });

        Some((
            Self {
                fin: byte0 & FINBIT_MASK != 0,
                rsv: (byte0 & RSV_MASK) >> 4,
                opcode: byte0 & OPCODE_MASK,
                masked,
                payload_length,
                masking_key,
            },
            header_len,
        ))
    }
}
