//! Connection handling logic for chat clients.
//!
//! This module contains the per-connection control loop: authenticate,
//! announce the join, dispatch commands until the client leaves, clean up.
//!
//! # Connection Flow
//!
//! 1. Prompt for username and password over the raw line stream
//! 2. On failure, send `Authentication failed.` and close (never registered)
//! 3. On success, register the session, announce the join, send the welcome
//! 4. Loop: dispatch each inbound line, and drain the outbound queue that
//!    other connections' messages arrive on
//! 5. On `/exit`, EOF or a socket error: remove the session and every group
//!    membership, announce the departure, close

use crate::{
    connection::{ClientConnection, ConnectionHandle, ConnectionState, OutboundReceiver, Participant},
    credentials::CredentialStore,
    error::{ChatError, ServerError},
    messaging::{CommandDispatcher, CommandOutcome, InboundLine, LineCodec, MessageRouter},
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

pub(crate) const USERNAME_PROMPT: &str = "Enter username: ";
pub(crate) const PASSWORD_PROMPT: &str = "Enter password: ";
pub(crate) const WELCOME: &str = "Welcome to the chat server!";

type LineStream = Framed<TcpStream, LineCodec>;

/// Everything a connection task shares with the rest of the server.
#[derive(Debug, Clone)]
pub(crate) struct ConnectionContext {
    pub(crate) credentials: Arc<CredentialStore>,
    pub(crate) router: MessageRouter,
    pub(crate) dispatcher: CommandDispatcher,
    pub(crate) max_line_length: usize,
}

/// Handles a single client connection from accept to cleanup.
///
/// Returns an error only for failures on this client's own socket; the
/// registries are cleaned up before it is returned.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    mut client: ClientConnection,
    context: ConnectionContext,
) -> Result<(), ServerError> {
    let mut framed = Framed::new(stream, LineCodec::new(context.max_line_length));
    client.transition(ConnectionState::Authenticating)?;

    let Some(username) = authenticate(&mut framed, &context.credentials).await? else {
        client.transition(ConnectionState::Closed)?;
        return Ok(());
    };

    let (handle, outbound) = ConnectionHandle::channel(client.id, client.remote_addr);
    if let Err(e) = context.router.sessions().register(&handle, &username).await {
        warn!("🚫 Connection {} rejected: {} is already online", client.id, username);
        send(&mut framed, e.to_string()).await?;
        client.transition(ConnectionState::Closed)?;
        return Ok(());
    }
    client.transition(ConnectionState::Active)?;

    context
        .router
        .broadcast(client.id, &format!("{username} has joined the chat."))
        .await;

    let participant = Participant::new(client.id, username);
    let result = run_session(&mut framed, &mut client, &participant, outbound, &context).await;

    if context.router.disconnect(client.id).await.is_some() {
        info!("👋 {} left (connection {})", participant.username, client.id);
    }
    client.transition(ConnectionState::Closed)?;
    result
}

/// Runs the username/password exchange.
///
/// `Ok(None)` means the client is done: either the credentials were wrong
/// (and it has been told) or it hung up mid-handshake.
async fn authenticate(
    framed: &mut LineStream,
    credentials: &CredentialStore,
) -> Result<Option<String>, ServerError> {
    send(framed, USERNAME_PROMPT).await?;
    let Some(username) = read_credential(framed).await? else {
        return Ok(None);
    };

    send(framed, PASSWORD_PROMPT).await?;
    let Some(password) = read_credential(framed).await? else {
        return Ok(None);
    };

    if !credentials.authenticate(&username, &password) {
        info!("🔒 Authentication failed for '{}'", username);
        send(framed, ChatError::AuthenticationFailed.to_string()).await?;
        return Ok(None);
    }
    Ok(Some(username))
}

/// Reads one handshake line. An over-long line is kept as an empty string
/// so it can never match a credential.
async fn read_credential(framed: &mut LineStream) -> Result<Option<String>, ServerError> {
    match framed.next().await {
        Some(Ok(InboundLine::Line(line))) => Ok(Some(line)),
        Some(Ok(InboundLine::TooLong)) => Ok(Some(String::new())),
        Some(Err(e)) => Err(ServerError::Network(format!("read failed during login: {e}"))),
        None => {
            debug!("Peer closed during login");
            Ok(None)
        }
    }
}

/// The `Active` loop.
async fn run_session(
    framed: &mut LineStream,
    client: &mut ClientConnection,
    participant: &Participant,
    mut outbound: OutboundReceiver,
    context: &ConnectionContext,
) -> Result<(), ServerError> {
    send(framed, WELCOME).await?;

    loop {
        tokio::select! {
            inbound = framed.next() => {
                let line = match inbound {
                    Some(Ok(InboundLine::Line(line))) => line,
                    Some(Ok(InboundLine::TooLong)) => {
                        send(framed, format!("ERROR: Line exceeds {} bytes.", context.max_line_length)).await?;
                        continue;
                    }
                    Some(Err(e)) => {
                        warn!("Read error on connection {}: {}", client.id, e);
                        return Ok(());
                    }
                    None => {
                        debug!("🔌 Connection {} closed by peer", client.id);
                        return Ok(());
                    }
                };

                client.transition(ConnectionState::Active)?;
                match context.dispatcher.dispatch(participant, &line).await {
                    CommandOutcome::Reply(reply) => send(framed, reply).await?,
                    CommandOutcome::Exit => {
                        debug!("Connection {} sent /exit", client.id);
                        return Ok(());
                    }
                    CommandOutcome::Handled | CommandOutcome::Ignored => {}
                }
            }

            // Our handle lives in the session registry, so the queue stays open.
            Some(message) = outbound.recv() => {
                send(framed, message).await?;
            }
        }
    }
}

async fn send(framed: &mut LineStream, line: impl Into<String>) -> Result<(), ServerError> {
    framed
        .send(line.into())
        .await
        .map_err(|e| ServerError::Network(format!("write failed: {e}")))
}
