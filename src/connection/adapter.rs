//! The transport adapter splicing WebSocket framing into a byte-stream stack.
//!
//! [`WebSocketTransport`] implements [`TransportInput`] and [`TransportOutput`]
//! itself and wraps an inner layer implementing the same contract (typically
//! the AMQP engine's plain transport). Network bytes enter through
//! [`tail`](TransportInput::tail), are validated as the upgrade reply or
//! unwrapped as frames, and the payload is poured into the inner layer's tail.
//! Bytes the inner layer produces are wrapped into masked binary frames and
//! exposed through [`head`](TransportOutput::head).
//!
//! With framing disabled every call goes straight to the inner layer.

use crate::buffer::TransportBuffer;
use crate::config::WebSocketConfig;
use crate::connection::state::{StateEvent, WebSocketState};
use crate::error::{Error, Result};
use crate::handler::{DefaultHandler, WebSocketHandler};
use crate::protocol::handshake::find_header_end;
use crate::protocol::header::{PAYLOAD_SHORT_MAX, max_payload_for};
use crate::protocol::mask::{MASKING_KEY_LEN, apply_mask_from};
use crate::protocol::MessageKind;
use crate::transport::{Flow, TransportInput, TransportLayer, TransportOutput};

/// Progress through the payload of the inbound frame being routed.
#[derive(Debug, Clone, Copy)]
struct InboundFrame {
    kind: MessageKind,
    remaining: u64,
    masking_key: Option<[u8; MASKING_KEY_LEN]>,
    offset: usize,
}

impl InboundFrame {
    fn advance(&mut self, n: usize) {
        self.remaining -= n as u64;
        self.offset = self.offset.wrapping_add(n);
    }

    fn available(&self, buffered: usize) -> usize {
        usize::try_from(self.remaining).map_or(buffered, |r| r.min(buffered))
    }
}

/// Client-side WebSocket layer over an inner transport.
///
/// Owns three fixed-capacity buffers sized from
/// [`WebSocketConfig::max_frame_size`]: raw inbound bytes, raw outbound bytes
/// (the upgrade request or wrapped frames), and a scratch buffer holding the
/// payload of the last ping until its pong is sent.
pub struct WebSocketTransport<T, H = DefaultHandler> {
    inner: T,
    handler: H,
    config: WebSocketConfig,
    state: WebSocketState,
    input: TransportBuffer,
    output: TransportBuffer,
    ping: TransportBuffer,
    inbound: Option<InboundFrame>,
    pong_pending: bool,
    tail_closed: bool,
    head_closed: bool,
}

impl<T: TransportLayer> WebSocketTransport<T> {
    /// Wrap `inner` using the built-in handshake and codec.
    ///
    /// # Errors
    ///
    /// Returns the error from [`WebSocketConfig::validate`].
    pub fn new(inner: T, config: WebSocketConfig) -> Result<Self> {
        Self::with_handler(inner, config, DefaultHandler::new())
    }
}

impl<T: TransportLayer, H: WebSocketHandler> WebSocketTransport<T, H> {
    /// Wrap `inner` using a caller-supplied handler.
    ///
    /// # Errors
    ///
    /// Returns the error from [`WebSocketConfig::validate`].
    pub fn with_handler(inner: T, config: WebSocketConfig, handler: H) -> Result<Self> {
        config.validate()?;
        let mut transport = Self {
            inner,
            handler,
            config,
            state: WebSocketState::NotStarted,
            input: TransportBuffer::new(0),
            output: TransportBuffer::new(0),
            ping: TransportBuffer::new(0),
            inbound: None,
            pong_pending: false,
            tail_closed: false,
            head_closed: false,
        };
        if transport.config.enabled {
            transport.allocate();
        }
        Ok(transport)
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> WebSocketState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    #[must_use]
    pub fn config(&self) -> &WebSocketConfig {
        &self.config
    }

    #[must_use]
    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Switch framing on or off before any traffic has been framed.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] once the handshake has started
    /// - the error from [`WebSocketConfig::validate`] when enabling an
    ///   incomplete configuration
    pub fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        if enabled == self.config.enabled {
            return Ok(());
        }
        if self.state.is_started() {
            return Err(Error::InvalidArgument(format!(
                "cannot toggle framing in state {}",
                self.state
            )));
        }
        if enabled {
            self.config.clone().with_enabled(true).validate()?;
        }
        self.config.enabled = enabled;
        if enabled {
            self.allocate();
        }
        tracing::debug!(enabled, "websocket framing toggled");
        Ok(())
    }

    fn allocate(&mut self) {
        let size = self.config.max_frame_size;
        if self.input.capacity() != size {
            self.input = TransportBuffer::new(size);
            self.output = TransportBuffer::new(size);
            self.ping = TransportBuffer::new(size);
        }
    }

    fn transition(&mut self, event: StateEvent) {
        let next = self.state.on(event);
        if next != self.state {
            tracing::debug!(from = %self.state, to = %next, ?event, "websocket state change");
            self.state = next;
        }
    }

    fn fail(&mut self, event: StateEvent, err: Error) -> Error {
        tracing::warn!(%err, state = %self.state, "websocket transport failed");
        self.transition(event);
        err
    }

    /// Validate the upgrade reply once its header block is complete.
    fn process_handshake(&mut self) -> Result<()> {
        let Some(end) = find_header_end(self.input.readable()) else {
            if self.input.is_full() {
                return Err(self.fail(
                    StateEvent::HandshakeFailed,
                    Error::InvalidHandshake(format!(
                        "reply exceeds {} bytes without a blank line",
                        self.input.capacity()
                    )),
                ));
            }
            return Ok(());
        };

        let accepted = self
            .handler
            .validate_upgrade_reply(&self.input.readable()[..end]);
        self.input.consume(end);
        if !accepted {
            return Err(self.fail(StateEvent::HandshakeFailed, Error::HandshakeRejected));
        }

        self.transition(StateEvent::ReplyAccepted);
        self.process_frames()
    }

    /// Route every complete piece of frame data currently buffered.
    fn process_frames(&mut self) -> Result<()> {
        while self.state == WebSocketState::Connected {
            let frame = match self.inbound {
                Some(frame) => frame,
                None => match self.next_frame()? {
                    Some(frame) => frame,
                    None => return Ok(()),
                },
            };

            let finished = match frame.kind {
                MessageKind::Amqp => self.forward_payload()?,
                MessageKind::Ping => self.collect_ping()?,
                _ => self.discard_payload(),
            };
            if !finished {
                return Ok(());
            }

            self.inbound = None;
            match frame.kind {
                MessageKind::Ping => self.pong_pending = true,
                MessageKind::Close => {
                    tracing::debug!("close frame received");
                    self.transition(StateEvent::StreamEnded);
                    self.inner.close_tail();
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Strip the next frame header, or report that more bytes are needed.
    fn next_frame(&mut self) -> Result<Option<InboundFrame>> {
        // A server may repeat its upgrade reply. "H" sets RSV1, which unwrap
        // rejects, so no frame can start with "HT".
        while self.input.readable().starts_with(b"HT") {
            match find_header_end(self.input.readable()) {
                Some(end) => {
                    tracing::debug!(len = end, "discarding repeated upgrade reply");
                    self.input.consume(end);
                }
                None if self.input.is_full() => {
                    return Err(self.fail(
                        StateEvent::ProtocolViolation,
                        Error::InvalidHandshake("repeated reply exceeds input buffer".into()),
                    ));
                }
                None => return Ok(None),
            }
        }

        let unwrapped = self.handler.unwrap_buffer(&mut self.input);
        match unwrapped.kind {
            MessageKind::Empty | MessageKind::InvalidLength => return Ok(None),
            MessageKind::Invalid => {
                let opcode = self.input.readable().first().copied().unwrap_or_default();
                return Err(self.fail(
                    StateEvent::ProtocolViolation,
                    Error::ProtocolViolation(format!("unsupported frame byte {opcode:#04x}")),
                ));
            }
            MessageKind::Ping if unwrapped.payload_len > PAYLOAD_SHORT_MAX as u64 => {
                return Err(self.fail(
                    StateEvent::ProtocolViolation,
                    Error::ProtocolViolation(format!(
                        "ping payload of {} bytes exceeds {PAYLOAD_SHORT_MAX}",
                        unwrapped.payload_len
                    )),
                ));
            }
            MessageKind::Ping => {
                self.ping.clear();
                self.pong_pending = false;
            }
            _ => {}
        }

        let frame = InboundFrame {
            kind: unwrapped.kind,
            remaining: unwrapped.payload_len,
            masking_key: unwrapped.masking_key,
            offset: 0,
        };
        self.inbound = Some(frame);
        Ok(Some(frame))
    }

    /// Pour AMQP payload into the inner transport as far as it has room.
    ///
    /// Returns `true` once the whole frame payload has been delivered.
    fn forward_payload(&mut self) -> Result<bool> {
        let Some(frame) = self.inbound.as_mut() else {
            return Ok(true);
        };

        while frame.remaining > 0 {
            let available = frame.available(self.input.len());
            if available == 0 {
                return Ok(false);
            }

            let room = match self.inner.capacity() {
                Flow::Bytes(room) => room,
                Flow::EndOfStream => {
                    tracing::debug!("inner transport closed its input; dropping payload");
                    self.tail_closed = true;
                    self.input.clear();
                    self.transition(StateEvent::TailClosed);
                    return Ok(false);
                }
            };

            let tail = self.inner.tail();
            let n = available.min(room).min(tail.remaining_mut());
            if n == 0 {
                return Ok(false);
            }

            let dst = &mut tail.spare_mut()[..n];
            dst.copy_from_slice(&self.input.readable()[..n]);
            if let Some(key) = frame.masking_key {
                apply_mask_from(dst, key, frame.offset);
            }
            tail.advance(n)?;
            self.input.consume(n);
            frame.advance(n);

            self.inner.process()?;
        }
        Ok(true)
    }

    /// Gather a ping's payload so the matching pong can be sent.
    fn collect_ping(&mut self) -> Result<bool> {
        let Some(frame) = self.inbound.as_mut() else {
            return Ok(true);
        };

        let n = frame.available(self.input.len());
        if n > 0 {
            let start = self.ping.len();
            self.ping.put(&self.input.readable()[..n])?;
            if let Some(key) = frame.masking_key {
                apply_mask_from(&mut self.ping.readable_mut()[start..], key, frame.offset);
            }
            self.input.consume(n);
            frame.advance(n);
        }
        Ok(frame.remaining == 0)
    }

    /// Drop the payload of a pong or close frame.
    fn discard_payload(&mut self) -> bool {
        let Some(frame) = self.inbound.as_mut() else {
            return true;
        };

        let n = frame.available(self.input.len());
        self.input.consume(n);
        frame.advance(n);
        frame.remaining == 0
    }

    /// Queue the upgrade request on the first send opportunity.
    fn pending_request(&mut self) -> Result<Flow> {
        if self.head_closed {
            self.transition(StateEvent::HeadClosed);
            return Ok(Flow::EndOfStream);
        }

        let queued = self
            .handler
            .create_upgrade_request(
                &self.config.host,
                &self.config.path,
                self.config.port,
                &self.config.subprotocol,
                &self.config.additional_headers,
            )
            .and_then(|request| self.output.put(request.as_bytes()));
        if let Err(err) = queued {
            return Err(self.fail(StateEvent::HandshakeFailed, err));
        }

        tracing::debug!(
            host = %self.config.host,
            path = %self.config.path,
            len = self.output.len(),
            "upgrade request queued"
        );
        self.transition(StateEvent::RequestQueued);
        Ok(Flow::Bytes(self.output.len()))
    }

    /// Wrap the pending pong and as much inner output as fits.
    fn pending_frames(&mut self) -> Result<Flow> {
        if self.pong_pending {
            let needed = self.handler.calculate_header_size(self.ping.len()) + self.ping.len();
            if self.output.remaining_mut() >= needed {
                self.handler
                    .wrap_pong(self.ping.readable(), &mut self.output)?;
                self.ping.clear();
                self.pong_pending = false;
            }
        }

        while !self.pong_pending {
            let n = match self.inner.pending()? {
                Flow::Bytes(n) => n.min(self.inner.head().len()),
                Flow::EndOfStream => {
                    if self.output.is_empty() {
                        self.transition(StateEvent::StreamEnded);
                        return Ok(Flow::EndOfStream);
                    }
                    break;
                }
            };

            let take = n.min(max_payload_for(self.output.remaining_mut()));
            if take == 0 {
                break;
            }
            self.handler
                .wrap_buffer(&self.inner.head()[..take], &mut self.output)?;
            self.inner.pop(take);
        }

        Ok(Flow::Bytes(self.output.len()))
    }
}

impl<T: TransportLayer, H: WebSocketHandler> TransportInput for WebSocketTransport<T, H> {
    fn capacity(&self) -> Flow {
        if !self.config.enabled {
            return self.inner.capacity();
        }
        if self.tail_closed || self.state.is_terminal() {
            return Flow::EndOfStream;
        }
        Flow::Bytes(self.input.remaining_mut())
    }

    fn tail(&mut self) -> &mut TransportBuffer {
        if !self.config.enabled {
            return self.inner.tail();
        }
        &mut self.input
    }

    fn process(&mut self) -> Result<()> {
        if !self.config.enabled {
            return self.inner.process();
        }
        match self.state {
            WebSocketState::NotStarted => Ok(()),
            WebSocketState::Connecting => self.process_handshake(),
            WebSocketState::Connected => self.process_frames(),
            WebSocketState::Closed | WebSocketState::Failed => {
                self.input.clear();
                Ok(())
            }
        }
    }

    fn close_tail(&mut self) {
        if !self.config.enabled {
            self.inner.close_tail();
            return;
        }
        self.tail_closed = true;
        self.inner.close_tail();
        self.transition(StateEvent::TailClosed);
    }
}

impl<T: TransportLayer, H: WebSocketHandler> TransportOutput for WebSocketTransport<T, H> {
    fn pending(&mut self) -> Result<Flow> {
        if !self.config.enabled {
            return self.inner.pending();
        }
        match self.state {
            WebSocketState::NotStarted => self.pending_request(),
            WebSocketState::Connecting => Ok(Flow::Bytes(self.output.len())),
            WebSocketState::Connected => self.pending_frames(),
            WebSocketState::Closed if !self.output.is_empty() && !self.head_closed => {
                Ok(Flow::Bytes(self.output.len()))
            }
            WebSocketState::Closed | WebSocketState::Failed => Ok(Flow::EndOfStream),
        }
    }

    fn head(&self) -> &[u8] {
        if !self.config.enabled {
            return self.inner.head();
        }
        self.output.readable()
    }

    fn pop(&mut self, n: usize) {
        if !self.config.enabled {
            self.inner.pop(n);
            return;
        }
        self.output.consume(n);
    }

    fn close_head(&mut self) {
        if !self.config.enabled {
            self.inner.close_head();
            return;
        }
        self.head_closed = true;
        self.inner.close_head();
        self.transition(StateEvent::HeadClosed);
    }
}

impl<T, H> std::fmt::Debug for WebSocketTransport<T, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("state", &self.state)
            .field("enabled", &self.config.enabled)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("pong_pending", &self.pong_pending)
            .finish_non_exhaustive()
    }
}
