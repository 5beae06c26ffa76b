//! Unified error type for partyline.

use partyline_payload::PipelineError;
use partyline_protocol::{MemberId, ProtocolError};
use partyline_session::SessionError;

/// Top-level error that wraps all crate-specific errors.
///
/// Transport failures arrive wrapped as [`SessionError::Connection`].
///
/// The `#[from]` conversions let `?` lift sub-crate errors directly.
#[derive(Debug, thiserror::Error)]
pub enum PartylineError {
    /// A wire-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A connection-level error (not connected, reconnect exhausted, ...).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A payload was of an unknown type or failed validation.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A payload body was not UTF-8 JSON.
    #[error("malformed payload body from {member_id}: {reason}")]
    MalformedBody { member_id: MemberId, reason: String },

    /// An outbound payload body could not be serialized.
    #[error("failed to encode payload body: {0}")]
    Encode(#[from] serde_json::Error),
}
