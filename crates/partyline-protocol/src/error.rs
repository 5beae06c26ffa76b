//! Error types for the protocol layer.
//!
//! Each crate in partyline defines its own error enum. When you see a
//! `ProtocolError`, the problem is in the bytes on the wire, not in the
//! socket or in a payload body.

/// Errors that can occur while encoding or decoding envelopes.
///
/// These are contract errors: the peer (or the caller) produced something
/// that is not a valid message. They are reported, never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The buffer ended in the middle of a value.
    #[error("unexpected end of buffer while reading {0}")]
    Truncated(&'static str),

    /// A varint ran past 10 bytes.
    #[error("varint exceeds 64 bits")]
    VarintOverflow,

    /// A tag used field number 0, which protobuf reserves.
    #[error("invalid field tag {0:#x}")]
    InvalidTag(u64),

    /// A field arrived with a wire type this decoder cannot handle,
    /// either because it is a group or because a known field used the
    /// wrong encoding.
    #[error("field {field} has unsupported wire type {wire_type}")]
    InvalidWireType { field: u32, wire_type: u8 },

    /// A string field was not valid UTF-8.
    #[error("field `{0}` is not valid UTF-8")]
    InvalidUtf8(&'static str),

    /// An envelope with no variant was handed to the encoder.
    #[error("envelope has no message set")]
    NoMessageSet,
}
