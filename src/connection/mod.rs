//! The WebSocket connection layer: state machine, transport adapter and
//! route selection.
//!
//! ## Lifecycle
//!
//! 1. **NotStarted** - nothing sent; the first `pending()` queues the upgrade request
//! 2. **Connecting** - request sent, waiting for `HTTP/1.1 101`
//! 3. **Connected** - traffic flows through frame wrap/unwrap
//! 4. **Closed** / **Failed** - terminal
//!
//! ## Example
//!
//! ```rust,ignore
//! use amqpws::{WebSocketConfig, WebSocketTransport};
//!
//! let config = WebSocketConfig::new("broker.example.com", "/$servicebus/websocket", 443, "AMQPWSB10");
//! let mut transport = WebSocketTransport::new(amqp_transport, config)?;
//!
//! if let Flow::Bytes(n) = transport.pending()? {
//!     socket.write_all(&transport.head()[..n])?;
//!     transport.pop(n);
//! }
//! ```

mod adapter;
mod sniffer;
mod state;

pub use adapter::WebSocketTransport;
pub use sniffer::{DEFAULT_SNIFF_CAPACITY, FixedRoute, ProtocolSniffer, Route, SniffingTransport};
pub use state::{StateEvent, WebSocketState};
