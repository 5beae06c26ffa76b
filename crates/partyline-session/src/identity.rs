//! Party, member, and session identifiers.
//!
//! Party ids are derived from a passphrase so everyone who types the same
//! phrase lands in the same party without a lookup service. The derivation
//! is a contract with the party service and with every other client that
//! talks to it, so it must stay bit-exact: SHA-256 of the UTF-8 bytes,
//! first eight digest bytes read as a little-endian `i64`, sign bit
//! cleared.

use partyline_protocol::{MemberId, PartyId};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Derives the party id for a passphrase. Always non-negative.
pub fn passphrase_to_id(passphrase: &str) -> PartyId {
    let digest = Sha256::digest(passphrase.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    PartyId(i64::from_le_bytes(head) & i64::MAX)
}

/// Generates a random 63-bit member id.
pub fn generate_member_id() -> MemberId {
    let bytes: [u8; 8] = rand::rng().random();
    MemberId((u64::from_be_bytes(bytes) & i64::MAX as u64) as i64)
}

/// Generates a session id: a random RFC-4122 version 4 UUID in its
/// lowercase hyphenated form.
///
/// `Builder::from_random_bytes` forces the version nibble to 4 and the
/// variant bits to `10`, so the other 122 bits stay random.
pub fn generate_session_id() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .hyphenated()
        .to_string()
}
