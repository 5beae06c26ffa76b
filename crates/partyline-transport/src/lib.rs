//! Transport abstraction layer for partyline.
//!
//! Provides the [`Connector`] and [`Connection`] traits that abstract over
//! the socket the client talks to the party service through. The
//! connection manager only ever sees these traits, so tests can swap in
//! an in-memory connector and production uses [`WebSocketConnector`].
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`
//! - `tls`: native TLS so `wss://` endpoints can be reached

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketConnector};

use std::fmt;
use std::future::Future;

use bytes::Bytes;

/// Close code for a normal, intentional closure.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code reported when the socket went away without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    /// WebSocket close code (1000 = normal).
    pub code: u16,
    /// Close reason sent by the peer, possibly empty.
    pub reason: String,
    /// `true` when the closing handshake completed.
    pub was_clean: bool,
}

impl CloseInfo {
    /// A clean close with code 1000.
    pub fn normal(reason: impl Into<String>) -> Self {
        Self {
            code: NORMAL_CLOSURE,
            reason: reason.into(),
            was_clean: true,
        }
    }

    /// The connection dropped without a closing handshake (code 1006).
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self {
            code: ABNORMAL_CLOSURE,
            reason: reason.into(),
            was_clean: false,
        }
    }

    /// Returns `true` for code 1000.
    pub fn is_normal(&self) -> bool {
        self.code == NORMAL_CLOSURE
    }
}

impl fmt::Display for CloseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "code {}", self.code)
        } else {
            write!(f, "code {} ({})", self.code, self.reason)
        }
    }
}

/// What a single [`Connection::recv`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// A binary frame.
    Binary(Bytes),
    /// The connection ended. No further frames will arrive.
    Closed(CloseInfo),
}

/// Opens outbound connections.
///
/// `Clone` because the connection manager moves a copy into each connect
/// attempt so the attempt can run while the manager keeps handling
/// commands.
pub trait Connector: Clone + Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;

    /// Opens a connection to `url`. Resolves once the socket is open.
    fn connect(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;
}

/// A single open connection that can send and receive binary frames.
pub trait Connection: Send + 'static {
    /// Sends one binary frame to the peer.
    fn send(
        &mut self,
        data: Bytes,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next frame.
    ///
    /// Returns `Ok(Incoming::Closed(_))` once when the connection ends;
    /// `Err` for read failures, after which the connection is unusable.
    fn recv(
        &mut self,
    ) -> impl Future<Output = Result<Incoming, TransportError>> + Send;

    /// Starts the closing handshake with the given code and reason.
    fn close(
        &mut self,
        code: u16,
        reason: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
