//! Test harness for driving the WebSocket layer without a network.
//!
//! [`Engine`] stands in for the AMQP engine's plain transport and
//! [`Peer`] plays a scripted WebSocket server.

#![allow(dead_code)]

mod engine;
mod peer;

pub use engine::Engine;
pub use peer::{ClientFrame, Fault, Peer};

use amqpws::{Flow, Result, TransportInput, TransportOutput};

/// Take everything the layer has ready to send.
pub fn drain<L: TransportOutput>(layer: &mut L) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    loop {
        let n = match layer.pending()? {
            Flow::Bytes(0) | Flow::EndOfStream => return Ok(out),
            Flow::Bytes(n) => n,
        };
        out.extend_from_slice(&layer.head()[..n]);
        layer.pop(n);
    }
}

/// Hand `bytes` to the layer in chunks no larger than its capacity.
///
/// Returns how many bytes were accepted before the layer stopped taking more.
pub fn deliver<L: TransportInput>(layer: &mut L, mut bytes: &[u8]) -> Result<usize> {
    let total = bytes.len();
    while !bytes.is_empty() {
        let room = match layer.capacity() {
            Flow::Bytes(0) | Flow::EndOfStream => break,
            Flow::Bytes(room) => room,
        };
        let n = room.min(bytes.len());
        layer.tail().put(&bytes[..n])?;
        layer.process()?;
        bytes = &bytes[n..];
    }
    Ok(total - bytes.len())
}
