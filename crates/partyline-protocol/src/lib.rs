//! Wire protocol for partyline.
//!
//! This crate defines the "language" the client and the party service
//! speak:
//!
//! - **Types** ([`C2s`], [`S2c`], [`PartyId`], [`MemberId`], ...): the
//!   envelopes and the messages they wrap.
//! - **Codec** ([`WireMessage`]): how those messages become protobuf
//!   bytes and back.
//! - **Errors** ([`ProtocolError`]): what can go wrong on the wire.
//!
//! The protocol layer sits between the transport (raw frames) and the
//! connection manager (party membership). It doesn't know about sockets or
//! payload bodies; bodies are opaque bytes here.
//!
//! ```text
//! Transport (frames) → Protocol (envelopes) → Session (connection, party)
//! ```

mod codec;
mod error;
mod types;
mod wire;

pub use codec::WireMessage;
pub use error::ProtocolError;
pub use types::{
    C2s, Data, Join, MemberId, PartyData, PartyId, S2c, UserJoin, UserPart,
};
