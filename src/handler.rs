//! Pluggable codec/handshake strategy used by the transport adapter.
//!
//! [`DefaultHandler`] is the built-in RFC 6455 implementation. An engine that
//! needs a different handshake (extra authentication round, a fixed test key)
//! supplies its own [`WebSocketHandler`] when building the adapter; the frame
//! methods default to the built-in codec.

use crate::buffer::TransportBuffer;
use crate::error::Result;
use crate::protocol::frame::{self, Unwrapped};
use crate::protocol::handshake::{self, UpgradeReply, UpgradeRequest};
use crate::protocol::header::header_size;
use crate::protocol::{OpCode, random_masking_key};

/// Codec and handshake operations the adapter delegates to.
pub trait WebSocketHandler {
    /// Build the HTTP Upgrade request text for one handshake attempt.
    ///
    /// # Errors
    ///
    /// [`Error::MissingField`](crate::Error::MissingField) if `host` or
    /// `protocol` is empty.
    fn create_upgrade_request(
        &mut self,
        host: &str,
        path: &str,
        port: u16,
        protocol: &str,
        additional_headers: &[(String, String)],
    ) -> Result<String>;

    /// Check a complete HTTP reply against the last request built.
    fn validate_upgrade_reply(&mut self, reply: &[u8]) -> bool;

    /// Wrap `src` in a masked binary frame appended to `dst`.
    ///
    /// # Errors
    ///
    /// See [`frame::wrap`].
    fn wrap_buffer(&mut self, src: &[u8], dst: &mut TransportBuffer) -> Result<()> {
        frame::wrap(src, dst)
    }

    /// Classify the frame at the front of `buf` and strip its header.
    fn unwrap_buffer(&mut self, buf: &mut TransportBuffer) -> Unwrapped {
        frame::unwrap(buf)
    }

    /// Turn a raw ping frame into a raw pong frame.
    ///
    /// # Errors
    ///
    /// See [`frame::create_pong`].
    fn create_pong(&mut self, ping: &TransportBuffer, pong: &mut TransportBuffer) -> Result<()> {
        frame::create_pong(ping, pong)
    }

    /// Wrap a ping's payload in a masked pong frame appended to `dst`.
    ///
    /// # Errors
    ///
    /// See [`frame::encode`].
    fn wrap_pong(&mut self, payload: &[u8], dst: &mut TransportBuffer) -> Result<()> {
        frame::encode(OpCode::Pong, payload, dst, random_masking_key()?)
    }

    /// Header length (including masking key) of a frame carrying `payload_len` bytes.
    fn calculate_header_size(&self, payload_len: usize) -> usize {
        header_size(payload_len)
    }
}

impl<H: WebSocketHandler + ?Sized> WebSocketHandler for Box<H> {
    fn create_upgrade_request(
        &mut self,
        host: &str,
        path: &str,
        port: u16,
        protocol: &str,
        additional_headers: &[(String, String)],
    ) -> Result<String> {
        (**self).create_upgrade_request(host, path, port, protocol, additional_headers)
    }

    fn validate_upgrade_reply(&mut self, reply: &[u8]) -> bool {
        (**self).validate_upgrade_reply(reply)
    }

    fn wrap_buffer(&mut self, src: &[u8], dst: &mut TransportBuffer) -> Result<()> {
        (**self).wrap_buffer(src, dst)
    }

    fn unwrap_buffer(&mut self, buf: &mut TransportBuffer) -> Unwrapped {
        (**self).unwrap_buffer(buf)
    }

    fn create_pong(&mut self, ping: &TransportBuffer, pong: &mut TransportBuffer) -> Result<()> {
        (**self).create_pong(ping, pong)
    }

    fn wrap_pong(&mut self, payload: &[u8], dst: &mut TransportBuffer) -> Result<()> {
        (**self).wrap_pong(payload, dst)
    }

    fn calculate_header_size(&self, payload_len: usize) -> usize {
        (**self).calculate_header_size(payload_len)
    }
}

/// State of the handshake attempt in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingHandshake {
    key: String,
    protocol: String,
}

/// The built-in RFC 6455 handler.
///
/// Each call to `create_upgrade_request` starts a new attempt with a fresh
/// key; `validate_upgrade_reply` consumes it, so a reply can be accepted at
/// most once per request.
#[derive(Debug, Default)]
pub struct DefaultHandler {
    pending: Option<PendingHandshake>,
}

impl DefaultHandler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a request has been built and its reply not yet validated.
    #[must_use]
    pub fn awaiting_reply(&self) -> bool {
        self.pending.is_some()
    }

    /// Build a request with a caller-chosen key.
    ///
    /// # Errors
    ///
    /// As [`WebSocketHandler::create_upgrade_request`].
    pub fn create_upgrade_request_with_key(
        &mut self,
        request: &UpgradeRequest,
        key: String,
    ) -> Result<String> {
        let text = request.write(&key)?;
        self.pending = Some(PendingHandshake {
            key,
            protocol: request.protocol.clone(),
        });
        Ok(text)
    }
}

impl WebSocketHandler for DefaultHandler {
    fn create_upgrade_request(
        &mut self,
        host: &str,
        path: &str,
        port: u16,
        protocol: &str,
        additional_headers: &[(String, String)],
    ) -> Result<String> {
        let request = UpgradeRequest::new(host, path, port, protocol, additional_headers);
        request.validate()?;
        self.create_upgrade_request_with_key(&request, handshake::generate_key()?)
    }

    fn validate_upgrade_reply(&mut self, reply: &[u8]) -> bool {
        if reply.is_empty() {
            return false;
        }
        let Some(pending) = self.pending.take() else {
            tracing::debug!("upgrade reply received with no request outstanding");
            return false;
        };

        match UpgradeReply::parse(reply).and_then(|r| r.verify(&pending.key, &pending.protocol)) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(%err, "upgrade reply rejected");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::compute_accept_key;

    fn reply_for(key: &str, protocol: &str) -> String {
        format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Protocol: {protocol}\r\n\
             Sec-WebSocket-Accept: {}\r\n\r\n",
            compute_accept_key(key)
        )
    }

    fn sent_key(request: &str) -> String {
        request
            .lines()
            .find_map(|l| l.strip_prefix("Sec-WebSocket-Key: "))
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_create_and_validate() {
        let mut handler = DefaultHandler::new();
        let request = handler
            .create_upgrade_request("host_XXX", "path1/path2", 0, "subprotocol_name", &[])
            .unwrap();
        assert!(request.starts_with("GET /path1/path2 HTTP/1.1\r\n"));
        assert!(handler.awaiting_reply());

        let reply = reply_for(&sent_key(&request), "subprotocol_name");
        assert!(handler.validate_upgrade_reply(reply.as_bytes()));
        assert!(!handler.awaiting_reply());
    }

    #[test]
    fn test_key_consumed_by_validation() {
        let mut handler = DefaultHandler::new();
        let request = handler
            .create_upgrade_request("example.com", "/", 0, "AMQPWSB10", &[])
            .unwrap();
        let reply = reply_for(&sent_key(&request), "AMQPWSB10");

        assert!(handler.validate_upgrade_reply(reply.as_bytes()));
        assert!(!handler.validate_upgrade_reply(reply.as_bytes()));
    }

    #[test]
    fn test_fresh_key_per_attempt() {
        let mut handler = DefaultHandler::new();
        let first = handler
            .create_upgrade_request("example.com", "/", 0, "AMQPWSB10", &[])
            .unwrap();
        let second = handler
            .create_upgrade_request("example.com", "/", 0, "AMQPWSB10", &[])
            .unwrap();
        assert_ne!(sent_key(&first), sent_key(&second));

        // the reply to the superseded attempt no longer validates
        let stale = reply_for(&sent_key(&first), "AMQPWSB10");
        assert!(!handler.validate_upgrade_reply(stale.as_bytes()));
    }

    #[test]
    fn test_validate_without_request() {
        let mut handler = DefaultHandler::new();
        assert!(!handler.validate_upgrade_reply(b"HTTP/1.1 101 Switching Protocols\r\n\r\n"));
    }

    #[test]
    fn test_validate_empty_reply_keeps_attempt() {
        let mut handler = DefaultHandler::new();
        handler
            .create_upgrade_request("example.com", "/", 0, "AMQPWSB10", &[])
            .unwrap();
        assert!(!handler.validate_upgrade_reply(&[]));
        assert!(handler.awaiting_reply());
    }

    #[test]
    fn test_missing_host_is_an_error() {
        let mut handler = DefaultHandler::new();
        let err = handler
            .create_upgrade_request("", "/", 0, "AMQPWSB10", &[])
            .unwrap_err();
        assert_eq!(err, crate::Error::MissingField("host"));
        assert!(!handler.awaiting_reply());
    }

    #[test]
    fn test_boxed_handler_delegates() {
        let mut handler: Box<dyn WebSocketHandler> = Box::new(DefaultHandler::new());
        assert_eq!(handler.calculate_header_size(10), 6);
        assert_eq!(handler.calculate_header_size(1000), 8);
        assert_eq!(handler.calculate_header_size(70000), 14);

        let mut dst = TransportBuffer::new(32);
        handler.wrap_buffer(b"amqp", &mut dst).unwrap();
        assert_eq!(handler.unwrap_buffer(&mut dst).payload_len, 4);
    }
}
