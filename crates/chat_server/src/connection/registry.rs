//! Session registry: which authenticated connection belongs to which user.
//!
//! This is the source of truth for "who is online". A connection is present
//! from the moment it authenticates until it disconnects, and a username is
//! held by at most one connection at a time.
//!
//! The map lives behind a single exclusive lock owned by the registry.
//! Callers outside the crate only see the operations below; the router
//! borrows the locked [`SessionTable`] directly so it can fan out inside the
//! same critical section.

use super::{ConnectionHandle, ConnectionId};
use crate::error::ChatError;
use std::collections::HashMap;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) handle: ConnectionHandle,
    pub(crate) username: String,
}

/// The locked contents of a [`SessionRegistry`].
#[derive(Debug, Default)]
pub(crate) struct SessionTable {
    sessions: HashMap<ConnectionId, Session>,
}

impl SessionTable {
    pub(crate) fn insert(
        &mut self,
        handle: &ConnectionHandle,
        username: &str,
    ) -> Result<(), ChatError> {
        let taken = self
            .sessions
            .iter()
            .any(|(id, session)| *id != handle.id() && session.username == username);
        if taken {
            return Err(ChatError::AlreadyOnline(username.to_string()));
        }
        self.sessions.insert(
            handle.id(),
            Session {
                handle: handle.clone(),
                username: username.to_string(),
            },
        );
        Ok(())
    }

    pub(crate) fn remove(&mut self, conn: ConnectionId) -> Option<Session> {
        self.sessions.remove(&conn)
    }

    /// Linear scan by username.
    pub(crate) fn find_by_name(&self, username: &str) -> Option<&ConnectionHandle> {
        self.sessions
            .values()
            .find(|session| session.username == username)
            .map(|session| &session.handle)
    }

    pub(crate) fn handle(&self, conn: ConnectionId) -> Option<&ConnectionHandle> {
        self.sessions.get(&conn).map(|session| &session.handle)
    }

    pub(crate) fn username_of(&self, conn: ConnectionId) -> Option<&str> {
        self.sessions.get(&conn).map(|session| session.username.as_str())
    }

    pub(crate) fn handles(&self) -> impl Iterator<Item = &ConnectionHandle> {
        self.sessions.values().map(|session| &session.handle)
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions.len()
    }
}

/// Thread-safe mapping from live connection to authenticated username.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    table: Mutex<SessionTable>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `conn` as logged in as `username`.
    ///
    /// Re-registering the same connection overwrites its entry. Registering
    /// a username that another connection already holds fails with
    /// [`ChatError::AlreadyOnline`]; the check and the insert share one
    /// critical section.
    pub async fn register(&self, conn: &ConnectionHandle, username: &str) -> Result<(), ChatError> {
        let mut table = self.table.lock().await;
        table.insert(conn, username)?;
        info!("👤 Connection {} authenticated as {}", conn.id(), username);
        Ok(())
    }

    /// Removes `conn`, returning the username it was logged in as.
    pub async fn unregister(&self, conn: ConnectionId) -> Option<String> {
        let mut table = self.table.lock().await;
        let removed = table.remove(conn).map(|session| session.username);
        if let Some(username) = &removed {
            debug!("Connection {} ({}) unregistered", conn, username);
        }
        removed
    }

    pub async fn lookup_by_name(&self, username: &str) -> Option<ConnectionHandle> {
        self.table.lock().await.find_by_name(username).cloned()
    }

    pub async fn username_of(&self, conn: ConnectionId) -> Option<String> {
        self.table.lock().await.username_of(conn).map(str::to_string)
    }

    /// Copy of the whole mapping, taken under the lock.
    pub async fn snapshot(&self) -> HashMap<ConnectionId, String> {
        let table = self.table.lock().await;
        table
            .sessions
            .iter()
            .map(|(id, session)| (*id, session.username.clone()))
            .collect()
    }

    pub async fn online_count(&self) -> usize {
        self.table.lock().await.len()
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, SessionTable> {
        self.table.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::OutboundReceiver;

    fn handle(id: ConnectionId) -> (ConnectionHandle, OutboundReceiver) {
        ConnectionHandle::channel(id, "127.0.0.1:40000".parse().unwrap())
    }

    #[tokio::test]
    async fn register_then_lookup() {
        let registry = SessionRegistry::new();
        let (alice, _rx) = handle(1);
        registry.register(&alice, "alice").await.unwrap();

        let found = registry.lookup_by_name("alice").await.unwrap();
        assert_eq!(found.id(), 1);
        assert!(registry.lookup_by_name("bob").await.is_none());
        assert_eq!(registry.username_of(1).await.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn unregister_removes_entry_once() {
        let registry = SessionRegistry::new();
        let (alice, _rx) = handle(1);
        registry.register(&alice, "alice").await.unwrap();

        assert_eq!(registry.unregister(1).await.as_deref(), Some("alice"));
        assert!(registry.unregister(1).await.is_none());
        assert!(registry.lookup_by_name("alice").await.is_none());
        assert_eq!(registry.online_count().await, 0);
    }

    #[tokio::test]
    async fn username_held_by_one_connection() {
        let registry = SessionRegistry::new();
        let (first, _rx1) = handle(1);
        let (second, _rx2) = handle(2);
        registry.register(&first, "alice").await.unwrap();

        let err = registry.register(&second, "alice").await.unwrap_err();
        assert_eq!(err, ChatError::AlreadyOnline("alice".into()));
        assert_eq!(registry.snapshot().await.len(), 1);
        assert_eq!(registry.lookup_by_name("alice").await.unwrap().id(), 1);
    }

    #[tokio::test]
    async fn reregistering_same_connection_overwrites() {
        let registry = SessionRegistry::new();
        let (conn, _rx) = handle(3);
        registry.register(&conn, "alice").await.unwrap();
        registry.register(&conn, "alice").await.unwrap();
        registry.register(&conn, "bob").await.unwrap();

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get(&3).map(String::as_str), Some("bob"));
    }
}
