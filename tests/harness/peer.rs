//! Scripted WebSocket server: answers upgrade requests and speaks frames.

use amqpws::OpCode;
use amqpws::protocol::{FrameHeader, apply_mask, compute_accept_key};

/// Which part of the upgrade reply the peer gets wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    Status,
    Upgrade,
    Connection,
    Protocol,
    Accept,
}

/// A frame as the peer decoded it from client output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientFrame {
    pub fin: bool,
    pub opcode: OpCode,
    pub masked: bool,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Peer {
    protocol: String,
    fault: Fault,
}

impl Peer {
    pub fn new(protocol: &str) -> Self {
        Self {
            protocol: protocol.to_string(),
            fault: Fault::None,
        }
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = fault;
        self
    }

    /// The `Sec-WebSocket-Key` sent in `request`.
    pub fn request_key(request: &[u8]) -> Option<String> {
        std::str::from_utf8(request)
            .ok()?
            .lines()
            .find_map(|line| line.strip_prefix("Sec-WebSocket-Key: "))
            .map(str::to_string)
    }

    /// The 101 reply to `request`, spoiled according to the configured fault.
    pub fn reply(&self, request: &[u8]) -> Vec<u8> {
        let key = Self::request_key(request).unwrap_or_default();
        let status = match self.fault {
            Fault::Status => "HTTP/1.1 200 OK",
            _ => "HTTP/1.1 101 Switching Protocols",
        };
        let upgrade = match self.fault {
            Fault::Upgrade => "h2c",
            _ => "websocket",
        };
        let connection = match self.fault {
            Fault::Connection => "keep-alive",
            _ => "Upgrade",
        };
        let protocol = match self.fault {
            Fault::Protocol => "AMQPWSB09".to_string(),
            _ => self.protocol.clone(),
        };
        let accept = match self.fault {
            Fault::Accept => compute_accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            _ => compute_accept_key(&key),
        };

        format!(
            "{status}\r\n\
             Upgrade: {upgrade}\r\n\
             Connection: {connection}\r\n\
             Sec-WebSocket-Protocol: {protocol}\r\n\
             Sec-WebSocket-Accept: {accept}\r\n\r\n"
        )
        .into_bytes()
    }

    /// An unmasked, final server frame.
    pub fn frame(opcode: OpCode, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![0x80 | opcode.as_u8()];
        match payload.len() {
            len @ 0..=125 => out.push(len as u8),
            len @ 126..=65535 => {
                out.push(126);
                out.extend_from_slice(&(len as u16).to_be_bytes());
            }
            len => {
                out.push(127);
                out.extend_from_slice(&(len as u64).to_be_bytes());
            }
        }
        out.extend_from_slice(payload);
        out
    }

    pub fn binary(payload: &[u8]) -> Vec<u8> {
        Self::frame(OpCode::Binary, payload)
    }

    pub fn ping(payload: &[u8]) -> Vec<u8> {
        Self::frame(OpCode::Ping, payload)
    }

    pub fn close() -> Vec<u8> {
        Self::frame(OpCode::Close, &1000u16.to_be_bytes())
    }

    /// Decode every complete frame in `bytes`, unmasking payloads.
    pub fn read_frames(mut bytes: &[u8]) -> Vec<ClientFrame> {
        let mut frames = Vec::new();
        while let Some((header, header_len)) = FrameHeader::parse(bytes) {
            let len = header.payload_length as usize;
            let Some(body) = bytes.get(header_len..header_len + len) else {
                break;
            };
            let mut payload = body.to_vec();
            if let Some(key) = header.masking_key {
                apply_mask(&mut payload, key);
            }
            frames.push(ClientFrame {
                fin: header.fin,
                opcode: OpCode::from_u8(header.opcode).unwrap_or(OpCode::Continuation),
                masked: header.masked,
                payload,
            });
            bytes = &bytes[header_len + len..];
        }
        frames
    }
}
