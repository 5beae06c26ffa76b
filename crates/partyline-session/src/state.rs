//! The connection lifecycle state.

use std::fmt;

/// The current state of the connection.
///
/// ```text
///                 connect()            open
///  Disconnected ───────────→ Connecting ─────→ Connected
///       ↑  ↑                     │                 │ │
///       │  └──── Error ←─────────┘ socket error    │ │
///       │                                          │ │ disconnect() /
///       │        unclean close (→ reconnect timer) │ │ close code 1000
///       ├──────────────────────────────────────────┘ ↓
///       └──────────────────────────────────── Disconnecting
/// ```
///
/// The connection task owns the single authoritative value and publishes
/// every transition; `Error` and `Disconnecting` are transient and are
/// always followed by `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No socket.
    #[default]
    Disconnected,
    /// A socket is being opened.
    Connecting,
    /// The socket is open; party operations are allowed.
    Connected,
    /// The socket is closing.
    Disconnecting,
    /// Opening the socket failed.
    Error,
}

impl ConnectionState {
    /// Returns `true` only for [`ConnectionState::Connected`].
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}
