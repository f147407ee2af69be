//! Client-to-server payload masking (RFC 6455 Section 5.3).

use crate::error::Result;

/// Length of a masking key in bytes.
pub const MASKING_KEY_LEN: usize = 4;

/// Draw a fresh masking key from the operating system's random source.
///
/// Every outbound frame gets its own key; keys are never reused.
///
/// # Errors
///
/// Returns [`Error::Entropy`](crate::Error::Entropy) if the random source fails.
pub fn random_masking_key() -> Result<[u8; MASKING_KEY_LEN]> {
    let mut key = [0u8; MASKING_KEY_LEN];
    getrandom::getrandom(&mut key)?;
    Ok(key)
}

/// XOR `data` in place against the repeating 4-byte `mask`.
///
/// Masking is its own inverse: applying the same key twice restores the input.
#[inline]
pub fn apply_mask(data: &mut [u8], mask: [u8; MASKING_KEY_LEN]) {
    apply_mask_from(data, mask, 0);
}

/// XOR `data` against `mask`, as if `data` started `offset` bytes into the payload.
///
/// Lets a payload be unmasked in pieces as it streams through a buffer.
pub fn apply_mask_from(data: &mut [u8], mask: [u8; MASKING_KEY_LEN], offset: usize) {
    let mut rotated = mask;
    rotated.rotate_left(offset % MASKING_KEY_LEN);
    let word = u32::from_ne_bytes(rotated);

    let mut chunks = data.chunks_exact_mut(MASKING_KEY_LEN);
    for chunk in &mut chunks {
        let val = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) ^ word;
        chunk.copy_from_slice(&val.to_ne_bytes());
    }
    for (byte, key) in chunks.into_remainder().iter_mut().zip(rotated) {
        *byte ^= key;
    }
}
