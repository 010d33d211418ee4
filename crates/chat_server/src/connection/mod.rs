//! Connection identity, per-connection state and the session registry.
//!
//! A connection is owned by exactly one handler task. Everything else
//! (the session registry, group membership, the router) refers to it only
//! through a [`ConnectionId`] or a cloned [`ConnectionHandle`].

pub mod client;
pub mod registry;

pub use client::{ClientConnection, ConnectionState};
pub use registry::SessionRegistry;

use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Type alias for connection identifiers.
///
/// Connection IDs are used to uniquely identify client connections
/// throughout their lifecycle on the server.
pub type ConnectionId = usize;

/// Receiving half of a connection's outbound queue, drained by its handler.
pub type OutboundReceiver = mpsc::UnboundedReceiver<String>;

/// Cheap, cloneable reference to a live connection.
///
/// Holds the sending half of the connection's outbound queue. Enqueueing
/// never blocks, so the router can fan out while it holds a registry lock
/// without a slow socket stalling anyone else.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    remote_addr: SocketAddr,
    outbound: mpsc::UnboundedSender<String>,
}

impl ConnectionHandle {
    /// Creates a handle together with the queue receiver its handler drains.
    pub fn channel(id: ConnectionId, remote_addr: SocketAddr) -> (Self, OutboundReceiver) {
        let (outbound, receiver) = mpsc::unbounded_channel();
        (
            Self {
                id,
                remote_addr,
                outbound,
            },
            receiver,
        )
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Queues one line for delivery.
    ///
    /// Returns `false` if the connection's handler has already gone away.
    pub fn deliver(&self, line: impl Into<String>) -> bool {
        self.outbound.send(line.into()).is_ok()
    }
}

/// An authenticated connection as seen by the router: who is speaking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ConnectionId,
    pub username: String,
}

impl Participant {
    pub fn new(id: ConnectionId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deliver_reports_closed_queue() {
        let addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        let (handle, mut rx) = ConnectionHandle::channel(7, addr);
        assert_eq!(handle.id(), 7);
        assert_eq!(handle.remote_addr(), addr);

        assert!(handle.deliver("hello"));
        assert_eq!(rx.try_recv().unwrap(), "hello");

        drop(rx);
        assert!(!handle.deliver("lost"));
    }
}
