//! Core chat server implementation.
//!
//! This module contains the main `ChatServer` struct: it owns the shared
//! registries, binds the listener and runs the accept loop that spawns one
//! handler task per client.

use crate::{
    config::ServerConfig,
    connection::{ClientConnection, ConnectionId, SessionRegistry},
    credentials::CredentialStore,
    error::ServerError,
    groups::GroupRegistry,
    messaging::{CommandDispatcher, MessageRouter},
    server::handlers::{handle_connection, ConnectionContext},
    shutdown::ShutdownState,
};
use futures::{Stream, StreamExt};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// Pause after an accept error that is not tied to a single connection,
/// such as running out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// The chat server.
///
/// `ChatServer` ties together the credential store, the session and group
/// registries and the command dispatcher, and hands a clone of each to every
/// connection it accepts.
///
/// # Architecture
///
/// * **Credential Store**: read-only after startup
/// * **Session Registry**: username to connection, behind its own lock
/// * **Group Registry**: group name to members, behind its own lock
/// * **Message Router**: the only component that takes both locks,
///   session registry first
pub struct ChatServer {
    /// Server configuration settings
    config: ServerConfig,

    /// Accounts allowed to log in
    credentials: Arc<CredentialStore>,

    /// Routing over the shared registries
    router: MessageRouter,

    /// Command handling shared by all connections
    dispatcher: CommandDispatcher,

    /// Source of connection identifiers, never reused
    next_connection_id: AtomicUsize,
}

impl ChatServer {
    /// Creates a new chat server from a configuration and a loaded
    /// credential store. Nothing is bound until the server is started.
    pub fn new(config: ServerConfig, credentials: CredentialStore) -> Self {
        let router = MessageRouter::new(
            Arc::new(SessionRegistry::new()),
            Arc::new(GroupRegistry::new()),
        );
        let dispatcher = CommandDispatcher::new(router.clone());

        Self {
            config,
            credentials: Arc::new(credentials),
            router,
            dispatcher,
            next_connection_id: AtomicUsize::new(1),
        }
    }

    /// Binds the configured address.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let listener = TcpListener::bind(self.config.bind_address)
            .await
            .map_err(|e| {
                ServerError::Network(format!(
                    "Failed to bind {}: {}",
                    self.config.bind_address, e
                ))
            })?;
        Ok(listener)
    }

    /// Binds the configured address and serves until the shared shutdown
    /// state is flipped.
    pub async fn start_with_shutdown_state(&self, shutdown_state: ShutdownState) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener, Some(shutdown_state)).await
    }

    /// Runs the accept loop on an already-bound listener.
    ///
    /// Each accepted socket is handed to its own task. Stopping the loop
    /// does not close connections that are already being served. A failed
    /// accept is logged and the loop keeps going, so the only way out is
    /// shutdown.
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown_state: Option<ShutdownState>,
    ) -> Result<(), ServerError> {
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Network(e.to_string()))?;
        info!("🚀 Chat server listening on {}", local_addr);
        info!("🔐 {} account(s) loaded", self.credentials.len());

        self.accept_loop(accept_stream(listener), shutdown_state).await;
        info!("Server stopped");
        Ok(())
    }

    pub(crate) async fn accept_loop<S>(&self, incoming: S, shutdown_state: Option<ShutdownState>)
    where
        S: Stream<Item = io::Result<(TcpStream, SocketAddr)>>,
    {
        futures::pin_mut!(incoming);

        loop {
            if shutdown_state.as_ref().is_some_and(ShutdownState::is_shutdown_initiated) {
                info!("🛑 Accept loop stopping - shutdown initiated");
                break;
            }

            tokio::select! {
                accepted = incoming.next() => match accepted {
                    Some(Ok((stream, addr))) => self.spawn_connection(stream, addr),
                    Some(Err(e)) => match accept_backoff(&e) {
                        Some(delay) => {
                            error!("Failed to accept connection: {}, retrying in {:?}", e, delay);
                            tokio::time::sleep(delay).await;
                        }
                        None => warn!("Dropped connection during accept: {}", e),
                    },
                    None => break,
                },
                _ = wait_for_shutdown(shutdown_state.as_ref()) => {
                    info!("🛑 Accept loop stopping - shutdown initiated");
                    break;
                }
            }
        }
    }

    fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let id = self.next_connection_id();
        debug!("🔗 Connection {} accepted from {}", id, addr);
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
        }

        let client = ClientConnection::new(id, addr);
        let context = self.connection_context();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, client, context).await {
                error!("Connection {} error: {}", id, e);
            }
        });
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        self.router.sessions()
    }

    pub fn groups(&self) -> &Arc<GroupRegistry> {
        self.router.groups()
    }

    fn next_connection_id(&self) -> ConnectionId {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }

    fn connection_context(&self) -> ConnectionContext {
        ConnectionContext {
            credentials: self.credentials.clone(),
            router: self.router.clone(),
            dispatcher: self.dispatcher.clone(),
            max_line_length: self.config.max_line_length,
        }
    }
}

/// Turns a listener into a stream of accept results.
pub(crate) fn accept_stream(
    listener: TcpListener,
) -> impl Stream<Item = io::Result<(TcpStream, SocketAddr)>> {
    futures::stream::unfold(listener, |listener| async move {
        let accepted = listener.accept().await;
        Some((accepted, listener))
    })
}

/// How long to wait before accepting again after `e`.
///
/// Errors that belong to one half-open connection are skipped straight
/// away. Anything else, such as EMFILE, will fail again
/// immediately, so the loop backs off instead of spinning.
fn accept_backoff(e: &io::Error) -> Option<Duration> {
    match e.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock => None,
        _ => Some(ACCEPT_BACKOFF),
    }
}

async fn wait_for_shutdown(state: Option<&ShutdownState>) {
    match state {
        Some(state) => state.wait().await,
        None => std::future::pending().await,
    }
}
