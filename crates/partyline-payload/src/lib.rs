//! Payload bodies for partyline: the type registry and the domain decoders.
//!
//! Members broadcast `(type name, JSON body)` pairs. This crate turns such
//! a pair into a typed [`Payload`]:
//!
//! ```text
//! body (JSON) → PayloadRegistry::process(type, body)
//!                 ├─ validate   (TypeHandler, serde schema)
//!                 └─ transform  (parse: items, skills, coordinates, colors)
//!             → Payload::{Status, Location, Batched, Custom}
//! ```
//!
//! Every field of the built-in updates is a [`Patch`], so the consumer can
//! tell a missing key from an explicit `null` and only touch what the
//! sender actually sent.

mod builtin;
mod error;
pub mod parse;
mod patch;
mod registry;
mod types;

pub use builtin::{
    BatchedUpdate, LOCATION_UPDATE, LocationUpdate, PARTY_BATCHED_CHANGE,
    RawBatchedChange, RawLocationUpdate, RawStatusUpdate, STATUS_UPDATE,
    StatusUpdate,
};
pub use error::PipelineError;
pub use patch::Patch;
pub use registry::{FnHandler, Payload, PayloadRegistry, SchemaHandler, TypeHandler};
pub use types::{Color, Coordinate, ItemStack, Misc, RuneStack, Skill};
