//! The connection manager: one socket, its lifecycle, and party membership.
//!
//! This is the central piece of the session layer. It's responsible for:
//! - Opening the socket and tracking the [`ConnectionState`]
//! - Reconnecting with exponential backoff after an unclean close
//! - Building outbound envelopes (join, part, data)
//! - Decoding inbound envelopes and emitting them as [`ConnectionEvent`]s
//!
//! # Actor model
//!
//! Everything mutable (the socket, the state, the reconnect timer, the
//! current party) is owned by a single Tokio task, the *connection actor*.
//! The [`ConnectionManager`] you hold is only a handle: each method sends a
//! command over a channel and waits for the actor's reply on a `oneshot`.
//! Because the actor processes one thing at a time, none of that state
//! needs a lock.
//!
//! ```text
//!  ConnectionManager ──(Command)──→ ┌──────────────────┐ ──(ConnectionEvent)──→ subscriber
//!  ConnectionManager ──(Command)──→ │ ConnectionActor  │
//!                                   │  socket, state,  │ ──(watch)──→ state()
//!          socket frames ─────────→ │  timer, party    │
//!                                   └──────────────────┘
//! ```
//!
//! Dropping every handle closes the command channel; the actor then closes
//! the socket and exits.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use partyline_protocol::{C2s, Data, Join, MemberId, PartyId, S2c, WireMessage};
use partyline_transport::{
    CloseInfo, Connection, Connector, Incoming, NORMAL_CLOSURE, TransportError,
    WebSocketConnector,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::identity::{generate_member_id, passphrase_to_id};
use crate::{
    ConnectionConfig, ConnectionEvent, ConnectionState, ReconnectPolicy,
    SessionError,
};

/// Close reason sent when the caller disconnects.
const DISCONNECT_REASON: &str = "client disconnect";

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

/// Commands sent from a [`ConnectionManager`] handle to the actor.
enum Command {
    Connect {
        reply: Reply<()>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    Join {
        party_id: PartyId,
        member_id: MemberId,
        reply: Reply<()>,
    },
    JoinWithPassphrase {
        passphrase: String,
        member_id: Option<MemberId>,
        reply: Reply<(PartyId, MemberId)>,
    },
    Leave {
        reply: Reply<()>,
    },
    SendData {
        type_name: String,
        body: Bytes,
        reply: Reply<()>,
    },
    CurrentParty {
        reply: oneshot::Sender<Option<(PartyId, MemberId)>>,
    },
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to a running connection actor.
///
/// Cheap to clone; every clone talks to the same connection. Created with
/// [`ConnectionManager::start`] (any [`Connector`]) or
/// [`ConnectionManager::websocket`].
///
/// # Example
///
/// ```rust,no_run
/// use partyline_session::{ConnectionConfig, ConnectionEvent, ConnectionManager};
///
/// # async fn run() -> Result<(), partyline_session::SessionError> {
/// let config = ConnectionConfig::new("https://party.example.com/ws");
/// let (manager, mut events) = ConnectionManager::websocket(config);
///
/// manager.connect().await?;
/// manager.join_with_passphrase("my party", None).await?;
///
/// while let Some(event) = events.recv().await {
///     if let ConnectionEvent::PartyData(data) = event {
///         println!("{} sent {}", data.member_id, data.type_name);
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ConnectionManager {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    session_id: Arc<str>,
}

impl ConnectionManager {
    /// Spawns the connection actor and returns a handle plus the event
    /// receiver.
    ///
    /// The actor starts `Disconnected`; nothing is dialed until
    /// [`connect`](Self::connect). Must be called inside a Tokio runtime.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start<C: Connector>(
        connector: C,
        config: ConnectionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let actor = ConnectionActor {
            connector,
            url: config.socket_url(),
            policy: config.reconnect,
            commands: command_rx,
            events: event_tx,
            state: state_tx,
            connection: None,
            pending: None,
            reconnect_at: None,
            attempts: 0,
            party_id: None,
            member_id: None,
        };
        tokio::spawn(actor.run());

        let manager = Self {
            commands: command_tx,
            state: state_rx,
            session_id: Arc::from(config.session_id),
        };
        (manager, event_rx)
    }

    /// Spawns a connection actor that dials over WebSocket.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn websocket(
        config: ConnectionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        Self::start(WebSocketConnector, config)
    }

    /// Opens the socket.
    ///
    /// Returns immediately if already connected. If a connect attempt is
    /// already in flight, waits for that attempt instead of starting a
    /// second one. Any pending automatic reconnect is cancelled and the
    /// attempt counter resets.
    ///
    /// # Errors
    /// - [`SessionError::Connection`]: the socket failed to open
    /// - [`SessionError::Cancelled`]: `disconnect()` was called meanwhile
    pub async fn connect(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Connect { reply }).await?
    }

    /// Closes the socket (code 1000), cancels any reconnect timer or
    /// in-flight connect, and forgets the current party.
    pub async fn disconnect(&self) {
        let (reply, done) = oneshot::channel();
        if self.commands.send(Command::Disconnect { reply }).is_ok() {
            let _ = done.await;
        }
    }

    /// Joins `party_id` as `member_id`.
    ///
    /// # Errors
    /// Returns [`SessionError::NotConnected`] unless connected.
    pub async fn join(
        &self,
        party_id: PartyId,
        member_id: MemberId,
    ) -> Result<(), SessionError> {
        self.request(|reply| Command::Join {
            party_id,
            member_id,
            reply,
        })
        .await?
    }

    /// Joins the party derived from `passphrase`.
    ///
    /// The member id is `member_id` if given, else the one from the
    /// current party, else a freshly generated one. Returns the ids used.
    ///
    /// # Errors
    /// Returns [`SessionError::NotConnected`] unless connected.
    pub async fn join_with_passphrase(
        &self,
        passphrase: &str,
        member_id: Option<MemberId>,
    ) -> Result<(PartyId, MemberId), SessionError> {
        let passphrase = passphrase.to_string();
        self.request(|reply| Command::JoinWithPassphrase {
            passphrase,
            member_id,
            reply,
        })
        .await?
    }

    /// Leaves the current party. A no-op when not connected.
    pub async fn leave(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Leave { reply }).await?
    }

    /// Broadcasts a payload of type `type_name` to the party.
    ///
    /// # Errors
    /// Returns [`SessionError::NotConnected`] unless connected.
    pub async fn send_data(
        &self,
        type_name: &str,
        body: impl Into<Bytes>,
    ) -> Result<(), SessionError> {
        let type_name = type_name.to_string();
        let body = body.into();
        self.request(|reply| Command::SendData {
            type_name,
            body,
            reply,
        })
        .await?
    }

    /// The party and member ids of the current party, if any.
    pub async fn current_party(&self) -> Option<(PartyId, MemberId)> {
        self.request(|reply| Command::CurrentParty { reply })
            .await
            .ok()
            .flatten()
    }

    /// The current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A receiver that observes every state the actor publishes.
    ///
    /// Transient states (`Error`, `Disconnecting`) are immediately
    /// followed by `Disconnected`, so a slow watcher may only see the
    /// latter.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// The session id sent in the socket URL.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| SessionError::Shutdown)?;
        response.await.map_err(|_| SessionError::Shutdown)
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state())
            .field("session_id", &self.session_id)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

type ConnectFuture<T> =
    Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send>>;

/// A connect attempt that is still dialing.
struct PendingConnect<T> {
    future: ConnectFuture<T>,
    /// Callers of `connect()` waiting on this attempt.
    waiters: Vec<Reply<()>>,
    /// `true` for automatic reconnect attempts.
    reconnect: bool,
}

/// The task that owns the socket. See the module docs.
struct ConnectionActor<C: Connector> {
    connector: C,
    url: String,
    policy: ReconnectPolicy,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    state: watch::Sender<ConnectionState>,
    /// `Some` exactly while the state is `Connected`.
    connection: Option<C::Connection>,
    pending: Option<PendingConnect<C::Connection>>,
    reconnect_at: Option<Instant>,
    /// Reconnect attempts made since the last successful open.
    attempts: u32,
    party_id: Option<PartyId>,
    member_id: Option<MemberId>,
}

impl<C: Connector> ConnectionActor<C> {
    /// Runs the actor loop until every handle is dropped.
    async fn run(mut self) {
        tracing::debug!(url = %self.url, "connection task started");

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                incoming = recv_frame(self.connection.as_mut()) => {
                    self.handle_incoming(incoming);
                }
                outcome = dial(self.pending.as_mut()) => {
                    self.handle_connect_outcome(outcome).await;
                }
                () = wait_until(self.reconnect_at) => {
                    self.reconnect_at = None;
                    self.begin_connect(true);
                }
            }
        }

        if let Some(mut connection) = self.connection.take() {
            let _ = connection.close(NORMAL_CLOSURE, DISCONNECT_REASON).await;
        }
        self.set_state(ConnectionState::Disconnected);
        tracing::debug!("connection task stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect { reply } => self.connect(reply),
            Command::Disconnect { reply } => {
                self.disconnect().await;
                let _ = reply.send(());
            }
            Command::Join {
                party_id,
                member_id,
                reply,
            } => {
                let result = self.join(party_id, member_id).await;
                let _ = reply.send(result);
            }
            Command::JoinWithPassphrase {
                passphrase,
                member_id,
                reply,
            } => {
                let party_id = passphrase_to_id(&passphrase);
                let member_id = member_id
                    .or(self.member_id)
                    .unwrap_or_else(generate_member_id);
                let result = self
                    .join(party_id, member_id)
                    .await
                    .map(|()| (party_id, member_id));
                let _ = reply.send(result);
            }
            Command::Leave { reply } => {
                let result = self.leave().await;
                let _ = reply.send(result);
            }
            Command::SendData {
                type_name,
                body,
                reply,
            } => {
                let result = self
                    .send(C2s::Data(Data { type_name, body }))
                    .await;
                let _ = reply.send(result);
            }
            Command::CurrentParty { reply } => {
                let _ = reply.send(self.party_id.zip(self.member_id));
            }
        }
    }

    // -- Lifecycle ---------------------------------------------------------

    fn connect(&mut self, reply: Reply<()>) {
        if self.connection.is_some() {
            let _ = reply.send(Ok(()));
            return;
        }
        if let Some(pending) = self.pending.as_mut() {
            pending.waiters.push(reply);
            return;
        }
        // A manual connect starts a fresh backoff series.
        self.reconnect_at = None;
        self.attempts = 0;
        self.begin_connect(false);
        if let Some(pending) = self.pending.as_mut() {
            pending.waiters.push(reply);
        }
    }

    fn begin_connect(&mut self, reconnect: bool) {
        let connector = self.connector.clone();
        let url = self.url.clone();
        tracing::info!(url = %self.url, reconnect, attempt = self.attempts, "connecting");

        self.set_state(ConnectionState::Connecting);
        self.pending = Some(PendingConnect {
            future: Box::pin(async move { connector.connect(&url).await }),
            waiters: Vec::new(),
            reconnect,
        });
    }

    async fn handle_connect_outcome(
        &mut self,
        outcome: Result<C::Connection, TransportError>,
    ) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        match outcome {
            Ok(connection) => {
                self.connection = Some(connection);
                self.attempts = 0;
                self.set_state(ConnectionState::Connected);
                tracing::info!(reconnect = pending.reconnect, "connected");
                self.emit(ConnectionEvent::Connected);
                for waiter in pending.waiters {
                    let _ = waiter.send(Ok(()));
                }
                if pending.reconnect {
                    self.rejoin().await;
                }
            }
            Err(e) => {
                let error = SessionError::from(e);
                tracing::warn!(error = %error, "connect failed");
                self.set_state(ConnectionState::Error);
                self.set_state(ConnectionState::Disconnected);
                self.emit(ConnectionEvent::Error(error.clone()));
                for waiter in pending.waiters {
                    let _ = waiter.send(Err(error.clone()));
                }
                if pending.reconnect {
                    self.schedule_reconnect();
                }
            }
        }
    }

    async fn disconnect(&mut self) {
        self.reconnect_at = None;
        if let Some(pending) = self.pending.take() {
            for waiter in pending.waiters {
                let _ = waiter.send(Err(SessionError::Cancelled));
            }
        }

        if let Some(mut connection) = self.connection.take() {
            self.set_state(ConnectionState::Disconnecting);
            if let Err(e) = connection.close(NORMAL_CLOSURE, DISCONNECT_REASON).await {
                tracing::debug!(error = %e, "close handshake failed");
            }
            self.emit(ConnectionEvent::Disconnected(CloseInfo::normal(
                DISCONNECT_REASON,
            )));
        }

        self.set_state(ConnectionState::Disconnected);
        self.party_id = None;
        self.member_id = None;
        self.attempts = 0;
        tracing::info!("disconnected");
    }

    /// Called when the open socket ends, cleanly or not.
    fn handle_close(&mut self, info: CloseInfo) {
        self.connection = None;

        if info.is_normal() {
            self.set_state(ConnectionState::Disconnecting);
            self.set_state(ConnectionState::Disconnected);
            tracing::info!(code = info.code, reason = %info.reason, "connection closed");
            self.emit(ConnectionEvent::Disconnected(info));
        } else {
            self.set_state(ConnectionState::Disconnected);
            tracing::warn!(code = info.code, reason = %info.reason, "connection lost");
            self.emit(ConnectionEvent::Disconnected(info));
            self.schedule_reconnect();
        }
    }

    fn schedule_reconnect(&mut self) {
        if self.policy.max_attempts == 0 {
            tracing::debug!("reconnection disabled");
            return;
        }

        let attempt = self.attempts + 1;
        match self.policy.delay_for(attempt) {
            Some(delay) => {
                self.attempts = attempt;
                self.reconnect_at = Some(Instant::now() + delay);
                tracing::info!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "reconnect scheduled"
                );
            }
            None => {
                tracing::warn!(attempts = self.attempts, "giving up on reconnection");
                self.emit(ConnectionEvent::Error(
                    SessionError::ReconnectExhausted {
                        attempts: self.attempts,
                    },
                ));
            }
        }
    }

    /// Re-sends `Join` after an automatic reconnect; the service forgets
    /// membership when the old socket drops.
    async fn rejoin(&mut self) {
        let (Some(party_id), Some(member_id)) = (self.party_id, self.member_id) else {
            return;
        };
        tracing::info!(%party_id, %member_id, "rejoining party after reconnect");
        if let Err(e) = self.send(C2s::Join(Join { party_id, member_id })).await {
            self.emit(ConnectionEvent::Error(e));
        }
    }

    // -- Party operations --------------------------------------------------

    async fn join(
        &mut self,
        party_id: PartyId,
        member_id: MemberId,
    ) -> Result<(), SessionError> {
        if self.connection.is_none() {
            return Err(SessionError::NotConnected);
        }
        self.party_id = Some(party_id);
        self.member_id = Some(member_id);
        tracing::info!(%party_id, %member_id, "joining party");
        self.send(C2s::Join(Join { party_id, member_id })).await
    }

    async fn leave(&mut self) -> Result<(), SessionError> {
        if self.connection.is_none() {
            return Ok(());
        }
        let result = self.send(C2s::Part).await;
        if let Some(party_id) = self.party_id.take() {
            tracing::info!(%party_id, "left party");
        }
        self.member_id = None;
        result
    }

    async fn send(&mut self, envelope: C2s) -> Result<(), SessionError> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(SessionError::NotConnected);
        };
        let bytes = envelope.encode()?;
        connection.send(bytes).await.map_err(SessionError::from)
    }

    // -- Inbound -----------------------------------------------------------

    fn handle_incoming(&mut self, incoming: Result<Incoming, TransportError>) {
        match incoming {
            Ok(Incoming::Binary(data)) => self.dispatch(&data),
            Ok(Incoming::Closed(info)) => self.handle_close(info),
            Err(e) => {
                let error = SessionError::from(e);
                self.emit(ConnectionEvent::Error(error.clone()));
                self.handle_close(CloseInfo::abnormal(error.to_string()));
            }
        }
    }

    fn dispatch(&mut self, data: &[u8]) {
        match S2c::decode(data) {
            Ok(S2c::UserJoin(join)) => {
                tracing::debug!(member_id = %join.member_id, "member joined");
                self.emit(ConnectionEvent::UserJoin(join));
            }
            Ok(S2c::UserPart(part)) => {
                tracing::debug!(member_id = %part.member_id, "member parted");
                self.emit(ConnectionEvent::UserPart(part));
            }
            Ok(S2c::PartyData(data)) => {
                tracing::trace!(
                    member_id = %data.member_id,
                    type_name = %data.type_name,
                    "party data"
                );
                self.emit(ConnectionEvent::PartyData(data));
            }
            Ok(S2c::Unset) => {
                tracing::debug!("dropping envelope with no message set");
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to decode envelope");
                self.emit(ConnectionEvent::Error(SessionError::Protocol(e)));
            }
        }
    }

    // -- Helpers -----------------------------------------------------------

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    fn emit(&self, event: ConnectionEvent) {
        // A dropped receiver just means nobody is listening.
        let _ = self.events.send(event);
    }
}

/// Resolves with the next frame, or never when there is no socket.
async fn recv_frame<T: Connection>(
    connection: Option<&mut T>,
) -> Result<Incoming, TransportError> {
    match connection {
        Some(connection) => connection.recv().await,
        None => std::future::pending().await,
    }
}

/// Resolves when the in-flight connect finishes, or never without one.
async fn dial<T>(
    pending: Option<&mut PendingConnect<T>>,
) -> Result<T, TransportError> {
    match pending {
        Some(pending) => (&mut pending.future).await,
        None => std::future::pending().await,
    }
}

/// Resolves at `deadline`, or never without one.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
