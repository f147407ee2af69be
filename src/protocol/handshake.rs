//! Client side of the WebSocket opening handshake (RFC 6455 Section 4).
//!
//! Builds the HTTP/1.1 Upgrade request and verifies the server's
//! `101 Switching Protocols` reply against the key that was sent.

use crate::error::{Error, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha1::{Digest, Sha1};
use std::collections::HashMap;

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Length of the raw (pre-base64) Sec-WebSocket-Key nonce.
pub const KEY_LEN: usize = 16;

/// Length of the Sec-WebSocket-Key as sent on the wire.
pub const ENCODED_KEY_LEN: usize = KEY_LEN.div_ceil(3) * 4;

const CRLF: &str = "\r\n";

/// Reply headers that must appear at most once.
const SECURITY_HEADERS: [&str; 4] = [
    "upgrade",
    "connection",
    "sec-websocket-accept",
    "sec-websocket-protocol",
];

/// Computes the Sec-WebSocket-Accept value from the client's Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(key + GUID))
///
/// # Example
///
/// ```
/// use amqpws::protocol::handshake::compute_accept_key;
///
/// let key = "dGhlIHNhbXBsZSBub25jZQ==";
/// assert_eq!(compute_accept_key(key), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Generate a fresh base64-encoded Sec-WebSocket-Key.
///
/// # Errors
///
/// Returns [`Error::Entropy`] if the random source fails.
pub fn generate_key() -> Result<String> {
    let mut nonce = [0u8; KEY_LEN];
    getrandom::getrandom(&mut nonce)?;
    Ok(BASE64.encode(nonce))
}

/// Offset just past the blank line ending the HTTP header block, if present.
#[must_use]
pub fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

/// Reject header names or values that would break the request framing.
///
/// # Errors
///
/// Returns [`Error::InvalidHeaderValue`] if `value` contains CR or LF.
pub fn validate_header_value(header_name: &str, value: &str) -> Result<()> {
    if value.contains('\r') || value.contains('\n') {
        return Err(Error::InvalidHeaderValue {
            header: header_name.to_string(),
            reason: "contains CR or LF characters".to_string(),
        });
    }
    Ok(())
}

/// Parse header lines into a map keyed by lowercase name.
///
/// # Errors
///
/// Returns [`Error::InvalidHandshake`] if a security-critical header repeats.
fn parse_headers<'a, I>(lines: I) -> Result<HashMap<String, String>>
where
    I: Iterator<Item = &'a str>,
{
    let mut headers: HashMap<String, String> = HashMap::new();

    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name_lower = name.trim().to_ascii_lowercase();
            if SECURITY_HEADERS.contains(&name_lower.as_str()) && headers.contains_key(&name_lower)
            {
                return Err(Error::InvalidHandshake(format!(
                    "Duplicate header: {}",
                    name.trim()
                )));
            }
            headers.insert(name_lower, value.trim().to_string());
        }
    }

    Ok(headers)
}

/// Parameters of one HTTP Upgrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRequest {
    pub host: String,
    /// Always starts with `/`.
    pub path: String,
    /// Omitted from the `Host` header when 0.
    pub port: u16,
    pub protocol: String,
    pub additional_headers: Vec<(String, String)>,
}

impl UpgradeRequest {
    /// Collect request parameters, normalizing the path to start with `/`.
    pub fn new(
        host: impl Into<String>,
        path: &str,
        port: u16,
        protocol: impl Into<String>,
        additional_headers: &[(String, String)],
    ) -> Self {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        Self {
            host: host.into(),
            path,
            port,
            protocol: protocol.into(),
            additional_headers: additional_headers.to_vec(),
        }
    }

    /// Value of the `Host` header: `host[:port]`.
    #[must_use]
    pub fn host_header(&self) -> String {
        if self.port == 0 {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Check that the request can be written.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingField`] if host or protocol is empty
    /// - [`Error::InvalidHeaderValue`] if any value contains CR or LF
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::MissingField("host"));
        }
        if self.protocol.is_empty() {
            return Err(Error::MissingField("protocol"));
        }
        validate_header_value("Host", &self.host)?;
        validate_header_value("Path", &self.path)?;
        validate_header_value("Sec-WebSocket-Protocol", &self.protocol)?;
        for (name, value) in &self.additional_headers {
            validate_header_value(name, name)?;
            validate_header_value(name, value)?;
        }
        Ok(())
    }

    /// Render the request text carrying `key` as its Sec-WebSocket-Key.
    ///
    /// # Errors
    ///
    /// As [`validate`](Self::validate).
    pub fn write(&self, key: &str) -> Result<String> {
        self.validate()?;

        let mut request = String::with_capacity(256);
        request.push_str(&format!("GET {} HTTP/1.1{CRLF}", self.path));
        request.push_str(&format!("Connection: Upgrade{CRLF}"));
        request.push_str(&format!("Upgrade: websocket{CRLF}"));
        request.push_str(&format!("Sec-WebSocket-Version: 13{CRLF}"));
        request.push_str(&format!("Sec-WebSocket-Key: {key}{CRLF}"));
        request.push_str(&format!("Sec-WebSocket-Protocol: {}{CRLF}", self.protocol));
        request.push_str(&format!("Host: {}{CRLF}", self.host_header()));
        for (name, value) in &self.additional_headers {
            request.push_str(&format!("{name}: {value}{CRLF}"));
        }
        request.push_str(CRLF);
        Ok(request)
    }

    /// Number of bytes [`write`](Self::write) produces for any generated key.
    ///
    /// # Errors
    ///
    /// As [`validate`](Self::validate).
    pub fn encoded_len(&self) -> Result<usize> {
        let placeholder = "A".repeat(ENCODED_KEY_LEN);
        self.write(&placeholder).map(|text| text.len())
    }
}

/// A parsed server reply to the upgrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeReply {
    pub status_line: String,
    pub upgrade: Option<String>,
    pub connection: Option<String>,
    pub protocol: Option<String>,
    pub accept: Option<String>,
}

impl UpgradeReply {
    /// Parse the status line and headers of a reply.
    ///
    /// Missing headers are recorded as `None`; [`verify`](Self::verify)
    /// decides whether they matter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandshake`] if:
    /// - The data is not valid UTF-8.
    /// - The reply is empty.
    /// - A security-critical header is duplicated.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|_| Error::InvalidHandshake("Invalid UTF-8".into()))?;

        let mut lines = text.lines();
        let status_line = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or_else(|| Error::InvalidHandshake("Empty response".into()))?
            .to_string();

        let mut headers = parse_headers(lines)?;

        Ok(Self {
            status_line,
            upgrade: headers.remove("upgrade"),
            connection: headers.remove("connection"),
            protocol: headers.remove("sec-websocket-protocol"),
            accept: headers.remove("sec-websocket-accept"),
        })
    }

    /// Check the reply against the key and subprotocol that were requested.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandshake`] naming the first failed condition:
    /// - The status line is not `HTTP/1.1 101 Switching Protocols`.
    /// - `Upgrade` does not mention `websocket`.
    /// - `Connection` does not mention `upgrade`.
    /// - `Sec-WebSocket-Protocol` differs from `protocol`.
    /// - `Sec-WebSocket-Accept` differs from the digest of `key`.
    pub fn verify(&self, key: &str, protocol: &str) -> Result<()> {
        let status = self.status_line.to_ascii_lowercase();
        if !(status.contains("http/1.1")
            && status.contains("101")
            && status.contains("switching protocols"))
        {
            return Err(Error::InvalidHandshake(format!(
                "Expected 101 Switching Protocols, got: {}",
                self.status_line
            )));
        }

        match &self.upgrade {
            Some(v) if v.to_ascii_lowercase().contains("websocket") => {}
            other => {
                return Err(Error::InvalidHandshake(format!(
                    "Invalid Upgrade header: {other:?}"
                )));
            }
        }

        match &self.connection {
            Some(v) if v.to_ascii_lowercase().contains("upgrade") => {}
            other => {
                return Err(Error::InvalidHandshake(format!(
                    "Invalid Connection header: {other:?}"
                )));
            }
        }

        if self.protocol.as_deref() != Some(protocol) {
            return Err(Error::InvalidHandshake(format!(
                "Expected Sec-WebSocket-Protocol {protocol}, got {:?}",
                self.protocol
            )));
        }

        let expected = compute_accept_key(key);
        if self.accept.as_deref() != Some(expected.as_str()) {
            return Err(Error::InvalidHandshake(format!(
                "Sec-WebSocket-Accept mismatch: expected {expected}, got {:?}",
                self.accept
            )));
        }

        Ok(())
    }
}
