//! The party tracker: connection events in, merged member state out.
//!
//! [`PartyTracker`] sits on top of a [`ConnectionManager`]. It reads the
//! manager's [`ConnectionEvent`]s, runs each `PartyData` body through the
//! [`PayloadRegistry`], merges the result into the sender's
//! [`MemberState`], and reports what changed as [`TrackerEvent`]s.
//!
//! The tracker is pull-driven and owned by one task: call
//! [`next_event`](PartyTracker::next_event) in a loop. Member state is
//! only ever touched from that loop and the `&mut self` methods, so it
//! needs no lock.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use partyline_payload::{Payload, PayloadRegistry};
use partyline_protocol::{MemberId, PartyData, PartyId};
use partyline_session::{ConnectionConfig, ConnectionEvent, ConnectionManager};
use partyline_transport::CloseInfo;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{MemberState, PartylineError};

/// What the tracker reports.
#[derive(Debug)]
pub enum TrackerEvent {
    /// The connection opened (first connect or reconnect).
    Connected,
    /// The connection closed.
    Disconnected(CloseInfo),
    /// A connection error, or a payload that could not be processed.
    /// Member state is unchanged.
    Error(PartylineError),
    /// A member joined. No state is created until they send something.
    MemberJoined {
        party_id: PartyId,
        member_id: MemberId,
    },
    /// A member's state changed; `state` is the merged result.
    MemberUpdate {
        member_id: MemberId,
        state: MemberState,
    },
    /// A tracked member left and their state was dropped.
    MemberRemoved(MemberId),
    /// A payload handled by a custom handler. Never merged into state.
    CustomData {
        member_id: MemberId,
        type_name: String,
        value: Value,
    },
}

/// Tracks the members of one party.
///
/// # Example
///
/// ```rust,no_run
/// use partyline::prelude::*;
///
/// # async fn run() -> Result<(), PartylineError> {
/// let mut tracker = PartyTracker::websocket(ConnectionConfig::new("https://party.example.com/ws"));
/// tracker.connect().await?;
/// tracker.join_party("my party", None).await?;
///
/// while let Some(event) = tracker.next_event().await {
///     if let TrackerEvent::MemberUpdate { member_id, state } = event {
///         println!("{member_id}: {state:?}");
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct PartyTracker {
    connection: ConnectionManager,
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
    /// Lifecycle events set aside while discarding stale party traffic.
    backlog: VecDeque<ConnectionEvent>,
    registry: Arc<PayloadRegistry>,
    members: HashMap<MemberId, MemberState>,
}

impl PartyTracker {
    /// Creates a tracker over an existing connection and its event
    /// receiver.
    pub fn new(
        connection: ConnectionManager,
        events: mpsc::UnboundedReceiver<ConnectionEvent>,
        registry: Arc<PayloadRegistry>,
    ) -> Self {
        Self {
            connection,
            events,
            backlog: VecDeque::new(),
            registry,
            members: HashMap::new(),
        }
    }

    /// Creates a tracker with a WebSocket connection and the built-in
    /// payload types.
    pub fn websocket(config: ConnectionConfig) -> Self {
        let (connection, events) = ConnectionManager::websocket(config);
        Self::new(connection, events, Arc::new(PayloadRegistry::new()))
    }

    /// Waits for the next connection event that produces a tracker event.
    ///
    /// Returns `None` once the connection task is gone.
    pub async fn next_event(&mut self) -> Option<TrackerEvent> {
        loop {
            let event = match self.backlog.pop_front() {
                Some(event) => event,
                None => self.events.recv().await?,
            };
            if let Some(event) = self.handle_event(event) {
                return Some(event);
            }
        }
    }

    /// Applies one connection event to member state.
    ///
    /// Returns `None` when nothing observable happened, e.g. a part for a
    /// member that was never tracked.
    pub fn handle_event(&mut self, event: ConnectionEvent) -> Option<TrackerEvent> {
        match event {
            ConnectionEvent::Connected => Some(TrackerEvent::Connected),
            ConnectionEvent::Disconnected(info) => Some(TrackerEvent::Disconnected(info)),
            ConnectionEvent::Error(e) => Some(TrackerEvent::Error(e.into())),
            ConnectionEvent::UserJoin(join) => Some(TrackerEvent::MemberJoined {
                party_id: join.party_id,
                member_id: join.member_id,
            }),
            ConnectionEvent::UserPart(part) => {
                if self.members.remove(&part.member_id).is_some() {
                    tracing::info!(member_id = %part.member_id, "member removed");
                    Some(TrackerEvent::MemberRemoved(part.member_id))
                } else {
                    tracing::debug!(member_id = %part.member_id, "part from untracked member");
                    None
                }
            }
            ConnectionEvent::PartyData(data) => Some(self.apply_party_data(data)),
        }
    }

    fn apply_party_data(&mut self, data: PartyData) -> TrackerEvent {
        let PartyData {
            member_id,
            type_name,
            body,
            ..
        } = data;

        let raw = match parse_body(&body) {
            Ok(raw) => raw,
            Err(reason) => {
                tracing::warn!(%member_id, %type_name, %reason, "malformed payload body");
                return TrackerEvent::Error(PartylineError::MalformedBody { member_id, reason });
            }
        };

        let payload = match self.registry.process(&type_name, &raw) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(%member_id, error = %e, "payload rejected");
                return TrackerEvent::Error(e.into());
            }
        };

        let members = &mut self.members;
        let state = match payload {
            Payload::Status(update) => {
                let state = members.entry(member_id).or_default();
                state.merge_status(update);
                state
            }
            Payload::Location(update) => {
                let state = members.entry(member_id).or_default();
                state.merge_location(update);
                state
            }
            Payload::Batched(update) => {
                let state = members.entry(member_id).or_default();
                state.merge_batched(update);
                state
            }
            Payload::Custom(value) => {
                return TrackerEvent::CustomData {
                    member_id,
                    type_name,
                    value,
                };
            }
        };

        tracing::trace!(%member_id, %type_name, "member state merged");
        TrackerEvent::MemberUpdate {
            member_id,
            state: state.clone(),
        }
    }

    // -- Connection helpers -------------------------------------------------

    pub async fn connect(&self) -> Result<(), PartylineError> {
        Ok(self.connection.connect().await?)
    }

    /// Joins the party for `passphrase`. See
    /// [`ConnectionManager::join_with_passphrase`].
    pub async fn join_party(
        &self,
        passphrase: &str,
        member_id: Option<MemberId>,
    ) -> Result<(PartyId, MemberId), PartylineError> {
        Ok(self
            .connection
            .join_with_passphrase(passphrase, member_id)
            .await?)
    }

    /// Leaves the party and forgets every member.
    ///
    /// This is a bulk reset: no [`TrackerEvent::MemberRemoved`] is emitted
    /// for the cleared members. Party traffic already queued when the call
    /// returns is discarded, so cleared members do not reappear.
    pub async fn leave_party(&mut self) -> Result<(), PartylineError> {
        let result = self.connection.leave().await;
        self.reset_members();
        Ok(result?)
    }

    /// Disconnects and forgets every member.
    ///
    /// Like [`leave_party`](Self::leave_party), this emits no per-member
    /// [`TrackerEvent::MemberRemoved`] and discards queued party traffic.
    pub async fn disconnect(&mut self) {
        self.connection.disconnect().await;
        self.reset_members();
    }

    /// Clears member state and drops every queued join, part and data
    /// event. Lifecycle events are kept for `next_event`.
    ///
    /// The connection task has handled the leave or disconnect command by
    /// the time this runs, so everything it received before is queued.
    fn reset_members(&mut self) {
        self.members.clear();
        let mut pending: Vec<ConnectionEvent> = self.backlog.drain(..).collect();
        while let Ok(event) = self.events.try_recv() {
            pending.push(event);
        }
        let mut dropped = 0usize;
        for event in pending {
            match event {
                ConnectionEvent::UserJoin(_)
                | ConnectionEvent::UserPart(_)
                | ConnectionEvent::PartyData(_) => dropped += 1,
                lifecycle => self.backlog.push_back(lifecycle),
            }
        }
        if dropped > 0 {
            tracing::debug!(dropped, "discarded stale party events");
        }
    }

    /// Serializes `body` as JSON and broadcasts it as `type_name`.
    pub async fn send<T: Serialize>(&self, type_name: &str, body: &T) -> Result<(), PartylineError> {
        let bytes = serde_json::to_vec(body)?;
        Ok(self.connection.send_data(type_name, bytes).await?)
    }

    // -- Accessors ------------------------------------------------------------

    pub fn member(&self, member_id: MemberId) -> Option<&MemberState> {
        self.members.get(&member_id)
    }

    pub fn members(&self) -> &HashMap<MemberId, MemberState> {
        &self.members
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn registry(&self) -> &PayloadRegistry {
        &self.registry
    }
}

/// Payload bodies are UTF-8 JSON.
fn parse_body(body: &[u8]) -> Result<Value, String> {
    let text = std::str::from_utf8(body).map_err(|e| e.to_string())?;
    serde_json::from_str(text).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body_rejects_invalid_utf8() {
        assert!(parse_body(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_parse_body_rejects_invalid_json() {
        assert!(parse_body(b"{not json").is_err());
    }

    #[test]
    fn test_parse_body_accepts_any_json_value() {
        assert_eq!(parse_body(b"[1]").unwrap(), serde_json::json!([1]));
    }
}
