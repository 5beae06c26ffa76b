//! Events emitted by the connection task.

use partyline_protocol::{PartyData, UserJoin, UserPart};
use partyline_transport::CloseInfo;

use crate::SessionError;

/// Everything the connection reports to its subscriber, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The socket opened (first connect or automatic reconnect).
    Connected,
    /// The socket closed.
    Disconnected(CloseInfo),
    /// Something failed without necessarily closing the socket: an
    /// undecodable frame, a failed connect or reconnect attempt, or the
    /// final [`SessionError::ReconnectExhausted`].
    Error(SessionError),
    /// A member joined the party.
    UserJoin(UserJoin),
    /// A member left the party.
    UserPart(UserPart),
    /// A member broadcast a payload.
    PartyData(PartyData),
}
