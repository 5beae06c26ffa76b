//! # partyline
//!
//! Client for a live party-coordination service: members of a party
//! broadcast their game state over a shared binary WebSocket, and this
//! crate turns that stream into one merged [`MemberState`] per member.
//!
//! The layers underneath are separate crates, re-exported here:
//!
//! - [`transport`]: the socket ([`Connector`](transport::Connector), WebSocket)
//! - [`protocol`]: the protobuf envelopes and ids
//! - [`session`]: the connection actor, reconnection, party identity
//! - [`payload`]: the payload type registry and domain decoders
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use partyline::prelude::*;
//!
//! # async fn run() -> Result<(), PartylineError> {
//! let config = ConnectionConfig::new("https://party.example.com/ws");
//! let mut tracker = PartyTracker::websocket(config);
//!
//! tracker.connect().await?;
//! let (party_id, member_id) = tracker.join_party("correct horse", None).await?;
//! println!("joined {party_id} as {member_id}");
//!
//! while let Some(event) = tracker.next_event().await {
//!     match event {
//!         TrackerEvent::MemberUpdate { member_id, state } => {
//!             println!("{member_id} -> {state:?}");
//!         }
//!         TrackerEvent::MemberRemoved(member_id) => println!("{member_id} left"),
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod member;
mod tracker;

pub use error::PartylineError;
pub use member::{Batched, Location, MemberState, Status, Vital};
pub use tracker::{PartyTracker, TrackerEvent};

pub use partyline_payload as payload;
pub use partyline_protocol as protocol;
pub use partyline_session as session;
pub use partyline_transport as transport;

/// Everything a typical consumer needs.
pub mod prelude {
    pub use crate::{MemberState, PartyTracker, PartylineError, TrackerEvent, Vital};
    pub use partyline_payload::{Payload, PayloadRegistry, PipelineError};
    pub use partyline_protocol::{MemberId, PartyId};
    pub use partyline_session::{
        ConnectionConfig, ConnectionEvent, ConnectionManager, ConnectionState,
        ReconnectPolicy, SessionError,
    };
    pub use partyline_transport::CloseInfo;
}
