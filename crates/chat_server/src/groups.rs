//! Named chat groups and their membership.
//!
//! Groups are created explicitly and live for the lifetime of the server.
//! Members are referenced by [`ConnectionId`] only; delivering to them goes
//! through the session registry. The group map has its own lock, separate
//! from the session registry's. Whenever both are needed the session lock
//! is taken first (see [`crate::messaging::MessageRouter`]).

use crate::connection::ConnectionId;
use crate::error::ChatError;
use std::collections::{HashMap, HashSet};
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// The locked contents of a [`GroupRegistry`].
#[derive(Debug, Default)]
pub(crate) struct GroupTable {
    groups: HashMap<String, HashSet<ConnectionId>>,
}

impl GroupTable {
    pub(crate) fn create(&mut self, name: &str) -> Result<(), ChatError> {
        if self.groups.contains_key(name) {
            return Err(ChatError::AlreadyExists(name.to_string()));
        }
        self.groups.insert(name.to_string(), HashSet::new());
        Ok(())
    }

    pub(crate) fn join(&mut self, conn: ConnectionId, name: &str) -> Result<(), ChatError> {
        let members = self
            .groups
            .get_mut(name)
            .ok_or_else(|| ChatError::GroupNotFound(name.to_string()))?;
        members.insert(conn);
        Ok(())
    }

    pub(crate) fn leave(&mut self, conn: ConnectionId, name: &str) -> Result<(), ChatError> {
        let members = self
            .groups
            .get_mut(name)
            .ok_or_else(|| ChatError::GroupNotFound(name.to_string()))?;
        if !members.remove(&conn) {
            return Err(ChatError::NotAMember(name.to_string()));
        }
        Ok(())
    }

    pub(crate) fn members(&self, name: &str) -> Result<&HashSet<ConnectionId>, ChatError> {
        self.groups
            .get(name)
            .ok_or_else(|| ChatError::GroupNotFound(name.to_string()))
    }

    /// Drops `conn` from every group, returning how many it was in.
    pub(crate) fn remove_everywhere(&mut self, conn: ConnectionId) -> usize {
        self.groups
            .values_mut()
            .map(|members| members.remove(&conn))
            .filter(|removed| *removed)
            .count()
    }

    pub(crate) fn resolve_longest_prefix(&self, text: &str) -> Option<(String, String)> {
        let matched = self
            .groups
            .keys()
            .filter(|name| !name.is_empty() && is_token_prefix(name, text))
            .max_by_key(|name| name.len())?;
        let remainder = text[matched.len()..].trim_start_matches(' ');
        Some((matched.clone(), remainder.to_string()))
    }
}

/// `name` starts `text` and is followed by end-of-text or a space.
fn is_token_prefix(name: &str, text: &str) -> bool {
    text.strip_prefix(name)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '))
}

/// Thread-safe registry of named groups.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    table: Mutex<GroupTable>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty group. Fails if the name is taken.
    pub async fn create(&self, name: &str) -> Result<(), ChatError> {
        self.table.lock().await.create(name)?;
        debug!("Group '{}' created", name);
        Ok(())
    }

    /// Adds `conn` to the group. Joining twice is a no-op.
    pub async fn join(&self, conn: ConnectionId, name: &str) -> Result<(), ChatError> {
        self.table.lock().await.join(conn, name)
    }

    pub async fn leave(&self, conn: ConnectionId, name: &str) -> Result<(), ChatError> {
        self.table.lock().await.leave(conn, name)
    }

    pub async fn members_of(&self, name: &str) -> Result<HashSet<ConnectionId>, ChatError> {
        self.table.lock().await.members(name).cloned()
    }

    /// Finds the longest existing group name that prefixes `text` on a token
    /// boundary, returning it with the rest of `text` (leading spaces removed).
    ///
    /// Group names may contain spaces, so the name/message split cannot be
    /// found by looking for the first space. With groups `dev` and
    /// `dev-team`, `"dev-team hello"` resolves to `dev-team`.
    pub async fn resolve_longest_prefix(&self, text: &str) -> Result<(String, String), ChatError> {
        self.table
            .lock()
            .await
            .resolve_longest_prefix(text)
            .ok_or_else(|| ChatError::GroupNotFound(text.to_string()))
    }

    pub async fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.table.lock().await.groups.keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, GroupTable> {
        self.table.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn create_rejects_duplicates() {
        let groups = GroupRegistry::new();
        groups.create("team").await.unwrap();
        assert_eq!(
            groups.create("team").await,
            Err(ChatError::AlreadyExists("team".into()))
        );
        assert_eq!(groups.group_names().await, vec!["team".to_string()]);
    }

    #[tokio::test]
    async fn join_requires_existing_group_and_is_idempotent() {
        let groups = GroupRegistry::new();
        assert_eq!(
            groups.join(1, "team").await,
            Err(ChatError::GroupNotFound("team".into()))
        );

        groups.create("team").await.unwrap();
        groups.join(1, "team").await.unwrap();
        groups.join(1, "team").await.unwrap();
        assert_eq!(groups.members_of("team").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn join_then_leave_removes_member() {
        let groups = GroupRegistry::new();
        groups.create("team").await.unwrap();
        groups.join(1, "team").await.unwrap();
        groups.join(2, "team").await.unwrap();
        groups.leave(1, "team").await.unwrap();

        let members = groups.members_of("team").await.unwrap();
        assert!(!members.contains(&1));
        assert!(members.contains(&2));

        assert_eq!(
            groups.leave(1, "team").await,
            Err(ChatError::NotAMember("team".into()))
        );
        assert_eq!(
            groups.leave(1, "nope").await,
            Err(ChatError::GroupNotFound("nope".into()))
        );
    }

    #[tokio::test]
    async fn longest_prefix_wins() {
        let groups = GroupRegistry::new();
        groups.create("dev").await.unwrap();
        groups.create("dev-team").await.unwrap();

        let (name, rest) = groups.resolve_longest_prefix("dev-team hello").await.unwrap();
        assert_eq!(name, "dev-team");
        assert_eq!(rest, "hello");

        let (name, rest) = groups.resolve_longest_prefix("dev hello there").await.unwrap();
        assert_eq!(name, "dev");
        assert_eq!(rest, "hello there");
    }

    #[tokio::test]
    async fn names_with_spaces_resolve() {
        let groups = GroupRegistry::new();
        groups.create("book").await.unwrap();
        groups.create("book club").await.unwrap();

        let (name, rest) = groups
            .resolve_longest_prefix("book club   meeting at 6")
            .await
            .unwrap();
        assert_eq!(name, "book club");
        assert_eq!(rest, "meeting at 6");

        let (name, rest) = groups.resolve_longest_prefix("book club").await.unwrap();
        assert_eq!(name, "book club");
        assert_eq!(rest, "");
    }

    #[tokio::test]
    async fn prefix_must_end_on_token_boundary() {
        let groups = GroupRegistry::new();
        groups.create("dev").await.unwrap();

        assert!(groups.resolve_longest_prefix("devops hi").await.is_err());
        assert!(groups.resolve_longest_prefix("de hi").await.is_err());
        assert!(groups.resolve_longest_prefix("").await.is_err());
    }

    #[tokio::test]
    async fn remove_everywhere_clears_all_memberships() {
        let groups = GroupRegistry::new();
        groups.create("a").await.unwrap();
        groups.create("b").await.unwrap();
        groups.create("c").await.unwrap();
        groups.join(5, "a").await.unwrap();
        groups.join(5, "b").await.unwrap();
        groups.join(6, "b").await.unwrap();

        assert_eq!(groups.lock().await.remove_everywhere(5), 2);
        assert!(groups.members_of("a").await.unwrap().is_empty());
        assert_eq!(
            groups.members_of("b").await.unwrap(),
            HashSet::from([6])
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_leave_no_duplicates() {
        let groups = Arc::new(GroupRegistry::new());
        groups.create("team").await.unwrap();

        let tasks: Vec<_> = [10, 20]
            .into_iter()
            .map(|conn| {
                let groups = groups.clone();
                tokio::spawn(async move {
                    for _ in 0..500 {
                        groups.join(conn, "team").await.unwrap();
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(
            groups.members_of("team").await.unwrap(),
            HashSet::from([10, 20])
        );
    }
}
