//! The duplex byte-stream contract shared by every transport layer.
//!
//! The input side receives bytes from the network (`capacity`, `tail`,
//! `process`, `close_tail`); the output side hands bytes to the network
//! (`pending`, `head`, `pop`, `close_head`). The WebSocket adapter both
//! implements and consumes this contract, so layers stack.
//!
//! ## Driving a layer
//!
//! ```rust,ignore
//! // inbound
//! if let Flow::Bytes(room) = layer.capacity() {
//!     let n = socket.read(&mut layer.tail().spare_mut()[..room])?;
//!     layer.tail().advance(n)?;
//!     layer.process()?;
//! }
//!
//! // outbound
//! if let Flow::Bytes(n) = layer.pending()? {
//!     let written = socket.write(&layer.head()[..n])?;
//!     layer.pop(written);
//! }
//! ```

use crate::buffer::TransportBuffer;
use crate::error::Result;

/// Byte count reported by `capacity` / `pending`, or the end of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    /// This many bytes can be written (`capacity`) or read (`pending`).
    Bytes(usize),
    /// The stream is closed in this direction.
    EndOfStream,
}

impl Flow {
    /// Byte count, treating end of stream as zero.
    #[inline]
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Flow::Bytes(n) => n,
            Flow::EndOfStream => 0,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_end_of_stream(self) -> bool {
        matches!(self, Flow::EndOfStream)
    }
}

/// Input side of a transport layer.
pub trait TransportInput {
    /// Writable room in the tail buffer, or end of stream once the tail closed.
    fn capacity(&self) -> Flow;

    /// Buffer the caller fills with freshly received bytes.
    fn tail(&mut self) -> &mut TransportBuffer;

    /// Consume the bytes appended to the tail since the last call.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffered bytes violate the layer's protocol.
    fn process(&mut self) -> Result<()>;

    /// Signal that no more input will arrive.
    fn close_tail(&mut self);
}

/// Output side of a transport layer.
pub trait TransportOutput {
    /// Bytes ready to send, or end of stream once nothing more will be produced.
    ///
    /// # Errors
    ///
    /// Returns an error if producing the output failed.
    fn pending(&mut self) -> Result<Flow>;

    /// The bytes ready to send. Call [`pending`](Self::pending) first.
    fn head(&self) -> &[u8];

    /// Drop `n` sent bytes from the front of [`head`](Self::head).
    fn pop(&mut self, n: usize);

    /// Signal that the network side will take no more output.
    fn close_head(&mut self);
}

/// A complete duplex transport layer.
pub trait TransportLayer: TransportInput + TransportOutput {}

impl<T: TransportInput + TransportOutput> TransportLayer for T {}
