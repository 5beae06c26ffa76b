//! Error types for the payload pipeline.

/// Why a payload body could not be turned into a [`Payload`](crate::Payload).
///
/// Both variants are per-message failures: they never affect the
/// connection or stored member state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// No handler is registered under this type name.
    #[error("no handler registered for payload type \"{0}\"")]
    UnknownType(String),

    /// The body did not match the schema of its declared type.
    #[error("invalid {type_name} payload: {reason}")]
    Validation { type_name: String, reason: String },
}
