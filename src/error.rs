//! Error types for the WebSocket transport layer.
//!
//! Frame classifications that a caller can retry on (`InvalidLength`) or that
//! describe the inbound data (`Invalid`) are reported as
//! [`MessageKind`](crate::protocol::MessageKind) values, not errors.

use thiserror::Error;

/// Result type alias for WebSocket transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while framing, handshaking or driving the adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A field required to build the upgrade request is empty.
    #[error("Missing field: {0} has no value")]
    MissingField(&'static str),

    /// Caller supplied an argument the operation cannot work with.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Destination buffer cannot hold the bytes to be written.
    #[error("Insufficient capacity: need {needed} bytes, have {available}")]
    InsufficientCapacity {
        /// Bytes the write required.
        needed: usize,
        /// Bytes the destination had room for.
        available: usize,
    },

    /// Payload exceeds the 32-bit length this codec encodes.
    #[error("Payload too large: {size} bytes (max: {max})")]
    PayloadTooLarge {
        /// Actual payload size.
        size: u64,
        /// Largest encodable payload size.
        max: u64,
    },

    /// Header name or value would corrupt the HTTP request.
    #[error("Invalid value for header {header}: {reason}")]
    InvalidHeaderValue {
        /// Header name.
        header: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Upgrade reply could not be parsed or verified.
    #[error("Invalid handshake: {0}")]
    InvalidHandshake(String),

    /// Server answered the upgrade request with an unacceptable reply.
    #[error("WebSocket upgrade rejected by peer")]
    HandshakeRejected,

    /// Peer sent a frame this layer cannot carry.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// The operating system random source failed.
    #[error("Entropy source failed: {0}")]
    Entropy(String),

    /// Error reported by the inner transport.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<getrandom::Error> for Error {
    fn from(err: getrandom::Error) -> Self {
        Error::Entropy(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InsufficientCapacity {
            needed: 16,
            available: 10,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient capacity: need 16 bytes, have 10"
        );
        assert_eq!(
            Error::MissingField("host").to_string(),
            "Missing field: host has no value"
        );
    }

    #[test]
    fn test_error_clone() {
        let err = Error::HandshakeRejected;
        let cloned = err.clone();
        assert_eq!(err, cloned);
    }
}
