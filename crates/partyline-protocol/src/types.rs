//! Core protocol types for the party service's wire format.
//!
//! Every type here travels on the wire inside one of the two envelopes:
//! [`C2s`] (client to server) or [`S2c`] (server to client). The field
//! numbers used by the codec are part of the service's contract and are
//! listed on each struct.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifier of a party (a coordination session).
///
/// A newtype over `i64` so a `MemberId` can't be passed where a party is
/// expected. The service treats ids as signed 64-bit integers; ids minted
/// by this client are always non-negative (63 bits), but ids decoded from
/// the wire may be anything, including negative.
///
/// `#[serde(transparent)]` serializes this as the bare number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PartyId(pub i64);

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Identifier of a member (a participant within a party).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MemberId(pub i64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Client → server messages
// ---------------------------------------------------------------------------

/// Join a party. Wire: `Join { 1: int64 party_id, 2: int64 member_id }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Join {
    pub party_id: PartyId,
    pub member_id: MemberId,
}

/// Broadcast a payload to the party.
/// Wire: `Data { 1: bytes body, 2: string type }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    /// Declared payload type, e.g. `"StatusUpdate"`.
    pub type_name: String,
    /// UTF-8 JSON body.
    pub body: Bytes,
}

/// Client-to-server envelope. Wire: one-of `join = 1`, `part = 2`,
/// `data = 3`.
///
/// Exactly one variant is active. `Unset` only ever comes out of the
/// decoder (an envelope whose one-of was empty); the encoder rejects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum C2s {
    Join(Join),
    /// Leave the current party. Wire: empty `Part {}`.
    Part,
    Data(Data),
    Unset,
}

// ---------------------------------------------------------------------------
// Server → client messages
// ---------------------------------------------------------------------------

/// A member joined the party.
/// Wire: `UserJoin { 1: int64 party_id, 2: int64 member_id }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserJoin {
    pub party_id: PartyId,
    pub member_id: MemberId,
}

/// A member left the party.
/// Wire: `UserPart { 1: int64 party_id, 2: int64 member_id }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserPart {
    pub party_id: PartyId,
    pub member_id: MemberId,
}

/// A payload another member broadcast.
/// Wire: `PartyData { 1: int64 party_id, 2: int64 member_id, 3: bytes body,
/// 4: string type }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyData {
    pub party_id: PartyId,
    pub member_id: MemberId,
    pub type_name: String,
    pub body: Bytes,
}

/// Server-to-client envelope. Wire: one-of `user_join = 1`,
/// `user_part = 2`, `data = 3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum S2c {
    UserJoin(UserJoin),
    UserPart(UserPart),
    PartyData(PartyData),
    Unset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_display_with_prefix() {
        assert_eq!(PartyId(42).to_string(), "P-42");
        assert_eq!(MemberId(-7).to_string(), "M--7");
    }

    #[test]
    fn test_ids_work_as_map_keys() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(MemberId(1), "alice");
        map.insert(MemberId(2), "bob");
        assert_eq!(map[&MemberId(1)], "alice");
    }
}
