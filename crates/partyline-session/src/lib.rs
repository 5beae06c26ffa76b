//! Connection and party-membership management for partyline.
//!
//! This crate owns the one socket a client keeps to the party service:
//!
//! 1. **Lifecycle**: opening, closing, and tracking [`ConnectionState`]
//! 2. **Reconnection**: exponential backoff after an unclean close
//!    ([`ReconnectPolicy`]), rejoining the party once back
//! 3. **Membership**: join, leave, and broadcast through the
//!    [`ConnectionManager`] handle
//! 4. **Identity**: passphrase-derived party ids and random member and
//!    session ids ([`passphrase_to_id`], [`generate_member_id`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Party tracker (above)  ← consumes ConnectionEvents, owns member state
//!     ↕
//! Session layer (this crate)  ← one socket, its state, the current party
//!     ↕
//! Protocol + transport (below)  ← envelopes and frames
//! ```

mod config;
mod error;
mod event;
mod identity;
mod manager;
mod state;

pub use config::{ConnectionConfig, ReconnectPolicy};
pub use error::SessionError;
pub use event::ConnectionEvent;
pub use identity::{generate_member_id, generate_session_id, passphrase_to_id};
pub use manager::ConnectionManager;
pub use state::ConnectionState;
