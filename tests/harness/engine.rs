//! In-memory stand-in for the AMQP engine's plain transport.

use amqpws::{Error, Flow, Result, TransportBuffer, TransportInput, TransportOutput};
use bytes::{Buf, BytesMut};

/// Records every byte delivered to it and serves whatever was queued with
/// [`send`](Engine::send).
#[derive(Debug)]
pub struct Engine {
    tail: TransportBuffer,
    received: BytesMut,
    outgoing: BytesMut,
    process_calls: usize,
    rejecting: bool,
    tail_closed: bool,
    head_closed: bool,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_capacity(4096)
    }

    /// Engine whose input accepts at most `capacity` bytes per `process` call.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tail: TransportBuffer::new(capacity),
            received: BytesMut::new(),
            outgoing: BytesMut::new(),
            process_calls: 0,
            rejecting: false,
            tail_closed: false,
            head_closed: false,
        }
    }

    /// Queue bytes for the engine to emit.
    pub fn send(&mut self, bytes: &[u8]) {
        self.outgoing.extend_from_slice(bytes);
    }

    /// Everything delivered so far.
    pub fn received(&self) -> &[u8] {
        &self.received
    }

    pub fn take_received(&mut self) -> Vec<u8> {
        self.received.split().to_vec()
    }

    pub fn unsent(&self) -> usize {
        self.outgoing.len()
    }

    pub fn process_calls(&self) -> usize {
        self.process_calls
    }

    pub fn is_tail_closed(&self) -> bool {
        self.tail_closed
    }

    pub fn is_head_closed(&self) -> bool {
        self.head_closed
    }

    /// Fail every later `process` call, as an engine does on a malformed frame.
    pub fn reject_input(&mut self) {
        self.rejecting = true;
    }

    /// Stop producing output; `pending` reports end of stream once drained.
    pub fn finish(&mut self) {
        self.head_closed = true;
    }
}

impl TransportInput for Engine {
    fn capacity(&self) -> Flow {
        if self.tail_closed {
            return Flow::EndOfStream;
        }
        Flow::Bytes(self.tail.remaining_mut())
    }

    fn tail(&mut self) -> &mut TransportBuffer {
        &mut self.tail
    }

    fn process(&mut self) -> Result<()> {
        self.process_calls += 1;
        if self.rejecting {
            return Err(Error::Transport("engine rejected input".into()));
        }
        self.received.extend_from_slice(self.tail.readable());
        self.tail.clear();
        Ok(())
    }

    fn close_tail(&mut self) {
        self.tail_closed = true;
    }
}

impl TransportOutput for Engine {
    fn pending(&mut self) -> Result<Flow> {
        if self.head_closed && self.outgoing.is_empty() {
            return Ok(Flow::EndOfStream);
        }
        Ok(Flow::Bytes(self.outgoing.len()))
    }

    fn head(&self) -> &[u8] {
        &self.outgoing
    }

    fn pop(&mut self, n: usize) {
        self.outgoing.advance(n.min(self.outgoing.len()));
    }

    fn close_head(&mut self) {
        self.head_closed = true;
    }
}
