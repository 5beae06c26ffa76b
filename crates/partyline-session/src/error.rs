//! Error types for the session layer.

use partyline_protocol::ProtocolError;

/// Errors surfaced by the [`ConnectionManager`](crate::ConnectionManager).
///
/// `Clone` because one failure can have several observers: every caller
/// waiting on the same connect attempt, plus the event channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// An operation that needs an open connection was attempted while
    /// not connected.
    #[error("not connected")]
    NotConnected,

    /// The socket failed to open, or failed while open.
    #[error("connection error: {0}")]
    Connection(String),

    /// An inbound frame could not be decoded, or an outbound envelope
    /// could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Automatic reconnection gave up. Nothing else is attempted until
    /// the caller connects again.
    #[error("reconnection failed after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    /// The in-flight connect was abandoned by `disconnect()`.
    #[error("connect cancelled by disconnect")]
    Cancelled,

    /// The connection task is gone (every handle but this one dropped,
    /// or the runtime is shutting down).
    #[error("connection manager shut down")]
    Shutdown,
}

impl From<partyline_transport::TransportError> for SessionError {
    fn from(err: partyline_transport::TransportError) -> Self {
        Self::Connection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use partyline_transport::TransportError;

    use super::*;

    #[test]
    fn test_from_transport_error_keeps_url_and_cause() {
        let err = SessionError::from(TransportError::ConnectFailed {
            url: "ws://127.0.0.1:9/?sessionId=abc".into(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        });
        match err {
            SessionError::Connection(message) => {
                assert!(message.contains("ws://127.0.0.1:9/"));
                assert!(message.contains("refused"));
            }
            other => panic!("expected a connection error, got {other:?}"),
        }
    }
}
