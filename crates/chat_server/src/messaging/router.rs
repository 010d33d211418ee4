//! Message routing between connected clients.
//!
//! The router implements broadcast, private and group delivery against the
//! session and group registries. It is also the only place that ever holds
//! both registry locks at once, and it always takes them through
//! [`MessageRouter::lock_in_order`]: session registry first, group registry
//! second.
//!
//! Delivery is best-effort per recipient. Every send only enqueues onto the
//! recipient's outbound queue, so fan-out happens inside the critical section
//! (keeping per-recipient order equal to issue order) without ever waiting on
//! a socket. A recipient whose queue is already closed is skipped and logged.

use crate::connection::registry::SessionTable;
use crate::connection::{ConnectionId, Participant, SessionRegistry};
use crate::error::ChatError;
use crate::groups::{GroupRegistry, GroupTable};
use std::sync::Arc;
use tokio::sync::MutexGuard;
use tracing::{debug, trace};

/// Routes text between connected clients.
#[derive(Debug, Clone)]
pub struct MessageRouter {
    sessions: Arc<SessionRegistry>,
    groups: Arc<GroupRegistry>,
}

impl MessageRouter {
    pub fn new(sessions: Arc<SessionRegistry>, groups: Arc<GroupRegistry>) -> Self {
        Self { sessions, groups }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn groups(&self) -> &Arc<GroupRegistry> {
        &self.groups
    }

    /// Acquires both registry locks in the global order.
    async fn lock_in_order(&self) -> (MutexGuard<'_, SessionTable>, MutexGuard<'_, GroupTable>) {
        let sessions = self.sessions.lock().await;
        let groups = self.groups.lock().await;
        (sessions, groups)
    }

    /// Delivers `text` to every registered connection except `sender`.
    ///
    /// Returns the number of recipients the line was queued for.
    pub async fn broadcast(&self, sender: ConnectionId, text: &str) -> usize {
        let sessions = self.sessions.lock().await;
        fan_out(&sessions, sessions.handles().map(|h| h.id()), sender, text)
    }

    /// Sends `"[<sender>]: <text>"` to the one connection logged in as
    /// `recipient`, or fails with [`ChatError::UserNotFound`].
    pub async fn send_private(
        &self,
        sender: &Participant,
        recipient: &str,
        text: &str,
    ) -> Result<(), ChatError> {
        let sessions = self.sessions.lock().await;
        let target = sessions
            .find_by_name(recipient)
            .ok_or_else(|| ChatError::UserNotFound(recipient.to_string()))?;

        if !target.deliver(format!("[{}]: {}", sender.username, text)) {
            debug!("Private message to {} dropped: connection closing", recipient);
            return Err(ChatError::UserNotFound(recipient.to_string()));
        }
        trace!("✉️ {} -> {}", sender.username, recipient);
        Ok(())
    }

    /// Sends `"[Group <group>][<sender>]: <text>"` to every other member.
    ///
    /// The sender must be a member; otherwise nothing is delivered and
    /// [`ChatError::NotAMember`] is returned. Returns the recipient count.
    pub async fn send_group(
        &self,
        sender: &Participant,
        group: &str,
        text: &str,
    ) -> Result<usize, ChatError> {
        let (sessions, groups) = self.lock_in_order().await;
        let members = groups.members(group)?;
        if !members.contains(&sender.id) {
            return Err(ChatError::NotAMember(group.to_string()));
        }

        let line = format!("[Group {}][{}]: {}", group, sender.username, text);
        Ok(fan_out(&sessions, members.iter().copied(), sender.id, &line))
    }

    /// Removes a connection from the session registry and from every group,
    /// then tells everyone still online that it left.
    ///
    /// Only the first call for a connection does anything; it returns the
    /// username the connection was logged in as.
    pub async fn disconnect(&self, conn: ConnectionId) -> Option<String> {
        let (mut sessions, mut groups) = self.lock_in_order().await;
        let session = sessions.remove(conn)?;
        let memberships = groups.remove_everywhere(conn);
        drop(groups);

        debug!(
            "Connection {} ({}) removed from registry and {} group(s)",
            conn, session.username, memberships
        );

        let notice = format!("{} has left the chat.", session.username);
        fan_out(&sessions, sessions.handles().map(|h| h.id()), conn, &notice);
        Some(session.username)
    }
}

/// Queues `line` for each of `targets` except `sender`, skipping anyone who
/// is no longer online. Returns how many queues accepted it.
fn fan_out(
    sessions: &SessionTable,
    targets: impl Iterator<Item = ConnectionId>,
    sender: ConnectionId,
    line: &str,
) -> usize {
    let mut delivered = 0;
    for conn in targets.filter(|conn| *conn != sender) {
        match sessions.handle(conn) {
            Some(handle) if handle.deliver(line) => delivered += 1,
            Some(_) => debug!("Skipping connection {}: outbound queue closed", conn),
            None => trace!("Skipping connection {}: not online", conn),
        }
    }
    delivered
}
