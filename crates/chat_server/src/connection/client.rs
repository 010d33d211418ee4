//! Client connection representation and lifecycle state.
//!
//! This module defines the structure of an individual client connection
//! and the state machine its handler walks through:
//!
//! ```text
//! Connecting -> Authenticating -> Active -> Closed
//!                     |                        ^
//!                     +------------------------+
//! ```

use super::ConnectionId;
use crate::error::ServerError;
use std::net::SocketAddr;
use std::time::SystemTime;
use tracing::debug;

/// Lifecycle state of a connection. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Accepted, nothing exchanged yet
    #[default]
    Connecting,
    /// Username/password handshake in progress
    Authenticating,
    /// Registered in the session registry and processing commands
    Active,
    /// Socket closed
    Closed,
}

impl ConnectionState {
    /// Whether `next` is a legal edge from this state.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Authenticating)
                | (Authenticating, Active)
                | (Authenticating, Closed)
                | (Active, Active)
                | (Active, Closed)
        )
    }
}

/// Represents an individual client connection to the server.
///
/// Tracks the connection's id, network address, when it was accepted and
/// where it currently sits in the lifecycle.
#[derive(Debug)]
pub struct ClientConnection {
    /// Identifier shared with the registries
    pub id: ConnectionId,

    /// The remote network address of the client
    pub remote_addr: SocketAddr,

    /// When this connection was established
    pub connected_at: SystemTime,

    state: ConnectionState,
}

impl ClientConnection {
    /// Creates a new client connection in the `Connecting` state.
    pub fn new(id: ConnectionId, remote_addr: SocketAddr) -> Self {
        Self {
            id,
            remote_addr,
            connected_at: SystemTime::now(),
            state: ConnectionState::default(),
        }
    }

    /// Gets the current lifecycle state of the connection.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Moves the connection to `next`, rejecting edges outside the state machine.
    pub fn transition(&mut self, next: ConnectionState) -> Result<(), ServerError> {
        if !self.state.can_transition_to(next) {
            return Err(ServerError::Internal(format!(
                "connection {} cannot move from {:?} to {:?}",
                self.id, self.state, next
            )));
        }
        if self.state != next {
            debug!("🔀 Connection {} {:?} -> {:?}", self.id, self.state, next);
        }
        self.state = next;
        Ok(())
    }
}
