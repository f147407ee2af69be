//! Fixed-capacity byte buffer shared by the codec and the transport adapter.
//!
//! The buffer is allocated once at construction and never grows. Writes that
//! do not fit fail with [`Error::InsufficientCapacity`] instead of truncating.

use crate::error::{Error, Result};

/// A fixed-capacity byte buffer with a readable front and a writable tail.
///
/// ```text
/// +---------------------+----------------------+
/// |  readable (len)     |  spare (remaining)   |
/// +---------------------+----------------------+
/// 0                    len                 capacity
/// ```
///
/// Consuming bytes from the front slides the remainder down to offset 0, so the
/// readable region is always contiguous and starts at the beginning.
#[derive(Clone, PartialEq, Eq)]
pub struct TransportBuffer {
    data: Box<[u8]>,
    len: usize,
}

impl TransportBuffer {
    /// Create an empty buffer holding at most `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    /// Create a buffer sized exactly to `bytes` and filled with them.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            data: bytes.to_vec().into_boxed_slice(),
            len: bytes.len(),
        }
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of readable bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == self.data.len()
    }

    /// Writable room left in the buffer.
    #[inline]
    #[must_use]
    pub fn remaining_mut(&self) -> usize {
        self.data.len() - self.len
    }

    /// The readable bytes, starting at offset 0.
    #[inline]
    #[must_use]
    pub fn readable(&self) -> &[u8] {
        &self.data[..self.len]
    }

    #[inline]
    pub fn readable_mut(&mut self) -> &mut [u8] {
        &mut self.data[..self.len]
    }

    /// The writable region after the readable bytes.
    ///
    /// Bytes written here become readable after [`advance`](Self::advance).
    #[inline]
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.len..]
    }

    /// Mark `n` bytes of the spare region as written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientCapacity`] if `n` exceeds the spare room.
    pub fn advance(&mut self, n: usize) -> Result<()> {
        self.check_room(n)?;
        self.len += n;
        Ok(())
    }

    /// Append `bytes` after the readable region.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientCapacity`] if the bytes do not fit. Nothing
    /// is written in that case.
    pub fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.check_room(bytes.len())?;
        self.data[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }

    /// Drop `n` bytes from the front and compact the rest to offset 0.
    ///
    /// Consuming more than is readable empties the buffer.
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.len);
        self.data.copy_within(n..self.len, 0);
        self.len -= n;
    }

    /// Discard all readable bytes.
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    fn check_room(&self, needed: usize) -> Result<()> {
        let available = self.remaining_mut();
        if needed > available {
            return Err(Error::InsufficientCapacity { needed, available });
        }
        Ok(())
    }
}

impl std::fmt::Debug for TransportBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportBuffer")
            .field("len", &self.len)
            .field("capacity", &self.data.len())
            .finish()
    }
}
