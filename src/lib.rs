//! # amqpws - AMQP over WebSocket transport layer
//!
//! `amqpws` lets an AMQP engine run over infrastructure that only lets
//! WebSocket traffic through. It sits between the engine's plain byte-stream
//! transport and the network, performs the RFC 6455 client handshake, and
//! wraps every outbound chunk in a masked binary frame.
//!
//! ## Features
//!
//! - **Sans-IO** layering over a capacity/tail/process + pending/head/pop contract
//! - **RFC 6455 framing** with all three payload length tiers and per-frame masking
//! - **Handshake validation** of status, headers and `Sec-WebSocket-Accept`
//! - **Pluggable handler** for custom handshakes, with the built-in codec as default
//! - **Pass-through mode** and protocol sniffing at connection start
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use amqpws::{Flow, TransportInput, TransportOutput, WebSocketConfig, WebSocketTransport};
//!
//! let config = WebSocketConfig::new("broker.example.com", "/", 443, "AMQPWSB10");
//! let mut ws = WebSocketTransport::new(amqp_transport, config)?;
//!
//! loop {
//!     if let Flow::Bytes(n) = ws.pending()? {
//!         let sent = socket.write(&ws.head()[..n])?;
//!         ws.pop(sent);
//!     }
//!     if let Flow::Bytes(room) = ws.capacity() {
//!         let read = socket.read(&mut ws.tail().spare_mut()[..room])?;
//!         ws.tail().advance(read)?;
//!         ws.process()?;
//!     }
//! }
//! ```

pub mod buffer;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod transport;

pub use buffer::TransportBuffer;
pub use config::{DEFAULT_MAX_FRAME_SIZE, DEFAULT_SUBPROTOCOL, WebSocketConfig};
pub use connection::{
    FixedRoute, ProtocolSniffer, Route, SniffingTransport, StateEvent, WebSocketState,
    WebSocketTransport,
};
pub use error::{Error, Result};
pub use handler::{DefaultHandler, WebSocketHandler};
pub use protocol::{MessageKind, OpCode, WS_GUID, compute_accept_key};
pub use transport::{Flow, TransportInput, TransportLayer, TransportOutput};

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn test_public_types_are_send() {
        assert_send::<Error>();
        assert_send::<WebSocketConfig>();
        assert_send::<TransportBuffer>();
        assert_send::<DefaultHandler>();
        assert_send::<WebSocketState>();
        assert_send::<MessageKind>();
        assert_send::<Route>();
        assert_send::<Flow>();
    }

    #[test]
    fn test_public_types_are_sync() {
        assert_sync::<Error>();
        assert_sync::<WebSocketConfig>();
        assert_sync::<TransportBuffer>();
        assert_sync::<DefaultHandler>();
        assert_sync::<WebSocketState>();
        assert_sync::<MessageKind>();
        assert_sync::<Route>();
        assert_sync::<Flow>();
    }
}
