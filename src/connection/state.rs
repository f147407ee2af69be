//! WebSocket connection phases and the transitions between them.
//!
//! ```text
//! NotStarted --RequestQueued--> Connecting --ReplyAccepted--> Connected
//!     |                             |                            |
//!     +----HandshakeFailed/TailClosed/HeadClosed--> Failed <--violation
//!                                                                |
//!                                          Closed <--StreamEnded-+
//! ```
//!
//! `Closed` and `Failed` are absorbing: every event leaves them unchanged.

/// Phase of the WebSocket layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WebSocketState {
    /// No upgrade request produced yet.
    #[default]
    NotStarted,
    /// Upgrade request queued, waiting for the server's reply.
    Connecting,
    /// Handshake complete; bytes flow through frame wrap/unwrap.
    Connected,
    /// Stream ended after a successful handshake.
    Closed,
    /// Handshake rejected, interrupted, or the peer violated the protocol.
    Failed,
}

/// Something that happened to the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateEvent {
    /// Upgrade request written to the output buffer.
    RequestQueued,
    /// Complete reply validated.
    ReplyAccepted,
    /// Upgrade request could not be built, or the reply failed validation.
    HandshakeFailed,
    /// Inbound side closed by the network.
    TailClosed,
    /// Outbound side closed and no handshake bytes are waiting to be sent.
    HeadClosed,
    /// Peer sent a close frame or the stream ended in either direction.
    StreamEnded,
    /// Peer sent something this layer cannot carry.
    ProtocolViolation,
}

impl WebSocketState {
    /// Apply `event` and return the resulting phase.
    ///
    /// Events that do not apply to the current phase leave it unchanged.
    #[must_use]
    pub const fn on(self, event: StateEvent) -> Self {
        use StateEvent::*;
        use WebSocketState::*;

        match (self, event) {
            (Closed | Failed, _) => self,
            (NotStarted, RequestQueued) => Connecting,
            (NotStarted, HandshakeFailed | TailClosed | HeadClosed) => Failed,
            (Connecting, ReplyAccepted) => Connected,
            (Connecting, HandshakeFailed | TailClosed | HeadClosed | ProtocolViolation) => Failed,
            (Connected, TailClosed | HeadClosed | StreamEnded) => Closed,
            (Connected, ProtocolViolation) => Failed,
            _ => self,
        }
    }

    /// `Closed` or `Failed`.
    #[must_use]
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, WebSocketState::Closed | WebSocketState::Failed)
    }

    /// Whether a handshake request has gone out and frames may follow.
    #[must_use]
    #[inline]
    pub const fn is_started(&self) -> bool {
        !matches!(self, WebSocketState::NotStarted)
    }
}

impl std::fmt::Display for WebSocketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebSocketState::NotStarted => write!(f, "NotStarted"),
            WebSocketState::Connecting => write!(f, "Connecting"),
            WebSocketState::Connected => write!(f, "Connected"),
            WebSocketState::Closed => write!(f, "Closed"),
            WebSocketState::Failed => write!(f, "Failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [WebSocketState; 5] = [
        WebSocketState::NotStarted,
        WebSocketState::Connecting,
        WebSocketState::Connected,
        WebSocketState::Closed,
        WebSocketState::Failed,
    ];

    const ALL_EVENTS: [StateEvent; 7] = [
        StateEvent::RequestQueued,
        StateEvent::ReplyAccepted,
        StateEvent::HandshakeFailed,
        StateEvent::TailClosed,
        StateEvent::HeadClosed,
        StateEvent::StreamEnded,
        StateEvent::ProtocolViolation,
    ];

    #[test]
    fn test_initial_state() {
        assert_eq!(WebSocketState::default(), WebSocketState::NotStarted);
    }

    #[test]
    fn test_happy_path() {
        let state = WebSocketState::NotStarted
            .on(StateEvent::RequestQueued)
            .on(StateEvent::ReplyAccepted);
        assert_eq!(state, WebSocketState::Connected);
        assert_eq!(state.on(StateEvent::StreamEnded), WebSocketState::Closed);
    }

    #[test]
    fn test_connected_only_from_connecting() {
        for state in ALL_STATES {
            for event in ALL_EVENTS {
                let next = state.on(event);
                if next == WebSocketState::Connected && state != WebSocketState::Connected {
                    assert_eq!(state, WebSocketState::Connecting);
                }
            }
        }
    }

    #[test]
    fn test_terminal_states_absorb() {
        for state in [WebSocketState::Closed, WebSocketState::Failed] {
            assert!(state.is_terminal());
            for event in ALL_EVENTS {
                assert_eq!(state.on(event), state);
            }
        }
    }

    #[test]
    fn test_handshake_failures() {
        let connecting = WebSocketState::Connecting;
        assert_eq!(connecting.on(StateEvent::HandshakeFailed), WebSocketState::Failed);
        assert_eq!(connecting.on(StateEvent::TailClosed), WebSocketState::Failed);
        assert_eq!(connecting.on(StateEvent::HeadClosed), WebSocketState::Failed);
    }

    #[test]
    fn test_close_before_request() {
        assert_eq!(
            WebSocketState::NotStarted.on(StateEvent::HeadClosed),
            WebSocketState::Failed
        );
    }

    #[test]
    fn test_not_started_ignores_reply() {
        assert_eq!(
            WebSocketState::NotStarted.on(StateEvent::ReplyAccepted),
            WebSocketState::NotStarted
        );
    }

    #[test]
    fn test_state_display() {
        assert_eq!(WebSocketState::NotStarted.to_string(), "NotStarted");
        assert_eq!(WebSocketState::Failed.to_string(), "Failed");
    }
}
