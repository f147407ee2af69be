//! Configuration for the WebSocket transport layer.

use crate::error::{Error, Result};
use crate::protocol::handshake::{UpgradeRequest, validate_header_value};
use crate::protocol::header::{
    MIN_HEADER_LENGTH_MASKED, PAYLOAD_LARGE_MAX, PAYLOAD_MEDIUM_MAX, PAYLOAD_SHORT_MAX,
};

/// Subprotocol registered for AMQP 1.0 over WebSocket (binary frames).
pub const DEFAULT_SUBPROTOCOL: &str = "AMQPWSB10";

/// Default capacity of each adapter buffer.
pub const DEFAULT_MAX_FRAME_SIZE: usize = PAYLOAD_MEDIUM_MAX;

/// Smallest buffer able to carry a pong answering a maximal ping.
pub const MIN_FRAME_SIZE: usize = MIN_HEADER_LENGTH_MASKED + PAYLOAD_SHORT_MAX;

/// WebSocket layer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSocketConfig {
    /// Host sent in the `Host` header.
    pub host: String,

    /// Request path; a leading `/` is added if missing.
    pub path: String,

    /// Port appended to the `Host` header. 0 omits it.
    pub port: u16,

    /// Value of `Sec-WebSocket-Protocol`; the reply must echo it.
    ///
    /// Default: `AMQPWSB10`
    pub subprotocol: String,

    /// Extra request headers, sent in insertion order.
    pub additional_headers: Vec<(String, String)>,

    /// Capacity of the input, output and ping buffers.
    ///
    /// Default: 65535
    pub max_frame_size: usize,

    /// Whether WebSocket framing is active. When `false` the adapter passes
    /// every call straight to the inner transport.
    ///
    /// Default: false
    pub enabled: bool,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            path: "/".to_string(),
            port: 0,
            subprotocol: DEFAULT_SUBPROTOCOL.to_string(),
            additional_headers: Vec::new(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            enabled: false,
        }
    }
}

impl WebSocketConfig {
    /// Configure WebSocket framing towards `host`. The returned config is enabled.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        path: impl Into<String>,
        port: u16,
        subprotocol: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
            port,
            subprotocol: subprotocol.into(),
            enabled: true,
            ..Default::default()
        }
    }

    /// Configuration that leaves the inner transport untouched.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Add an extra request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_headers.push((name.into(), value.into()));
        self
    }

    /// Set the capacity of each adapter buffer.
    #[must_use]
    pub const fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Check the configuration before a transport is built from it.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingField`] if enabled with an empty host or subprotocol
    /// - [`Error::InvalidHeaderValue`] if a header name or value contains CR/LF
    /// - [`Error::InvalidArgument`] if `max_frame_size` is outside
    ///   `MIN_FRAME_SIZE..=u32::MAX` or too small to hold the upgrade request
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.host.is_empty() {
            return Err(Error::MissingField("host"));
        }
        if self.subprotocol.is_empty() {
            return Err(Error::MissingField("protocol"));
        }
        for (name, value) in &self.additional_headers {
            validate_header_value(name, name)?;
            validate_header_value(name, value)?;
        }
        if !(MIN_FRAME_SIZE..=PAYLOAD_LARGE_MAX).contains(&self.max_frame_size) {
            return Err(Error::InvalidArgument(format!(
                "max_frame_size {} outside {}..={}",
                self.max_frame_size, MIN_FRAME_SIZE, PAYLOAD_LARGE_MAX
            )));
        }
        let request_len = self.upgrade_request().encoded_len()?;
        if request_len > self.max_frame_size {
            return Err(Error::InvalidArgument(format!(
                "max_frame_size {} cannot hold the {request_len}-byte upgrade request",
                self.max_frame_size
            )));
        }
        Ok(())
    }

    /// The upgrade request this configuration describes.
    #[must_use]
    pub fn upgrade_request(&self) -> UpgradeRequest {
        UpgradeRequest::new(
            self.host.as_str(),
            &self.path,
            self.port,
            self.subprotocol.as_str(),
            &self.additional_headers,
        )
    }
}
