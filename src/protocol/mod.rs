//! WebSocket wire format: frame codec and opening handshake (RFC 6455).

pub mod frame;
pub mod handshake;
pub mod header;
pub mod mask;
pub mod opcode;

pub use frame::{MessageKind, Unwrapped, create_pong, unwrap, wrap, wrap_with_key};
pub use handshake::{UpgradeReply, UpgradeRequest, WS_GUID, compute_accept_key};
pub use header::{FrameHeader, header_size, max_payload_for};
pub use mask::{apply_mask, apply_mask_from, random_masking_key};
pub use opcode::OpCode;
