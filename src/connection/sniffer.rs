//! Choosing between the WebSocket path and plain pass-through at connect time.
//!
//! A [`ProtocolSniffer`] looks at the first inbound bytes (or at nothing, for
//! a client that must speak first) and picks a [`Route`]. [`SniffingTransport`]
//! holds inbound bytes back until that decision is made, then configures the
//! wrapped [`WebSocketTransport`] and replays them into it.

use crate::buffer::TransportBuffer;
use crate::config::WebSocketConfig;
use crate::connection::adapter::WebSocketTransport;
use crate::error::{Error, Result};
use crate::handler::{DefaultHandler, WebSocketHandler};
use crate::transport::{Flow, TransportInput, TransportLayer, TransportOutput};

/// Inbound bytes held while no route has been chosen.
pub const DEFAULT_SNIFF_CAPACITY: usize = 1024;

/// Which path a connection takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Frame traffic and perform the upgrade handshake.
    WebSocket,
    /// Hand bytes to the inner transport unchanged.
    Passthrough,
}

/// Decides the route from the bytes received so far.
pub trait ProtocolSniffer {
    /// Return the route once it can be decided, `None` to wait for more bytes.
    ///
    /// `inbound` holds every byte received so far; it is empty when the
    /// decision is requested because the connection wants to send first.
    fn determine(&mut self, inbound: &[u8]) -> Option<Route>;
}

impl<F> ProtocolSniffer for F
where
    F: FnMut(&[u8]) -> Option<Route>,
{
    fn determine(&mut self, inbound: &[u8]) -> Option<Route> {
        self(inbound)
    }
}

/// A sniffer whose decision is known up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRoute(pub Route);

impl FixedRoute {
    /// WebSocket when the config enables framing, pass-through otherwise.
    #[must_use]
    pub fn from_config(config: &WebSocketConfig) -> Self {
        if config.enabled {
            Self(Route::WebSocket)
        } else {
            Self(Route::Passthrough)
        }
    }
}

impl ProtocolSniffer for FixedRoute {
    fn determine(&mut self, _inbound: &[u8]) -> Option<Route> {
        Some(self.0)
    }
}

/// A [`WebSocketTransport`] whose `enabled` flag is chosen by a sniffer.
pub struct SniffingTransport<T, H = DefaultHandler, S = FixedRoute> {
    transport: WebSocketTransport<T, H>,
    sniffer: S,
    route: Option<Route>,
    held: TransportBuffer,
}

impl<T: TransportLayer, H: WebSocketHandler, S: ProtocolSniffer> SniffingTransport<T, H, S> {
    #[must_use]
    pub fn new(transport: WebSocketTransport<T, H>, sniffer: S) -> Self {
        Self::with_capacity(transport, sniffer, DEFAULT_SNIFF_CAPACITY)
    }

    /// Hold at most `capacity` inbound bytes while undecided.
    #[must_use]
    pub fn with_capacity(transport: WebSocketTransport<T, H>, sniffer: S, capacity: usize) -> Self {
        Self {
            transport,
            sniffer,
            route: None,
            held: TransportBuffer::new(capacity),
        }
    }

    /// The chosen route, once decided.
    #[inline]
    #[must_use]
    pub fn route(&self) -> Option<Route> {
        self.route
    }

    #[must_use]
    pub fn transport(&self) -> &WebSocketTransport<T, H> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut WebSocketTransport<T, H> {
        &mut self.transport
    }

    pub fn into_transport(self) -> WebSocketTransport<T, H> {
        self.transport
    }

    /// Whether new inbound bytes must queue behind held ones.
    fn holding(&self) -> bool {
        self.route.is_none() || !self.held.is_empty()
    }

    fn decide(&mut self) -> Result<bool> {
        if self.route.is_some() {
            return Ok(true);
        }
        let Some(route) = self.sniffer.determine(self.held.readable()) else {
            return Ok(false);
        };

        tracing::debug!(?route, held = self.held.len(), "connection route chosen");
        self.transport.set_enabled(route == Route::WebSocket)?;
        self.route = Some(route);
        Ok(true)
    }

    /// Move held bytes into the transport as far as it has room.
    fn replay(&mut self) -> Result<()> {
        while !self.held.is_empty() {
            let room = match self.transport.capacity() {
                Flow::Bytes(room) => room,
                Flow::EndOfStream => {
                    self.held.clear();
                    break;
                }
            };
            let tail = self.transport.tail();
            let n = room.min(tail.remaining_mut()).min(self.held.len());
            if n == 0 {
                break;
            }
            tail.put(&self.held.readable()[..n])?;
            self.held.consume(n);
            self.transport.process()?;
        }
        Ok(())
    }
}

impl<T: TransportLayer, H: WebSocketHandler, S: ProtocolSniffer> TransportInput
    for SniffingTransport<T, H, S>
{
    fn capacity(&self) -> Flow {
        if self.holding() {
            return Flow::Bytes(self.held.remaining_mut());
        }
        self.transport.capacity()
    }

    fn tail(&mut self) -> &mut TransportBuffer {
        if self.holding() {
            return &mut self.held;
        }
        self.transport.tail()
    }

    fn process(&mut self) -> Result<()> {
        if !self.decide()? {
            if self.held.is_full() {
                return Err(Error::ProtocolViolation(format!(
                    "protocol not identified within {} bytes",
                    self.held.capacity()
                )));
            }
            return Ok(());
        }
        if self.held.is_empty() {
            return self.transport.process();
        }
        self.replay()
    }

    fn close_tail(&mut self) {
        self.transport.close_tail();
    }
}

impl<T: TransportLayer, H: WebSocketHandler, S: ProtocolSniffer> TransportOutput
    for SniffingTransport<T, H, S>
{
    fn pending(&mut self) -> Result<Flow> {
        if !self.decide()? {
            return Ok(Flow::Bytes(0));
        }
        self.transport.pending()
    }

    fn head(&self) -> &[u8] {
        if self.route.is_none() {
            return &[];
        }
        self.transport.head()
    }

    fn pop(&mut self, n: usize) {
        if self.route.is_some() {
            self.transport.pop(n);
        }
    }

    fn close_head(&mut self) {
        self.transport.close_head();
    }
}
