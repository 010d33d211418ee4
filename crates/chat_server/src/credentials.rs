//! Static credential store.
//!
//! Credentials come from a flat file with one `username:password` pair per
//! line. The store is built once at startup and never mutated afterwards, so
//! it is shared between connection tasks behind a plain `Arc` with no lock.

use crate::error::ServerError;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

/// Read-only mapping of username to password.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    users: HashMap<String, String>,
}

impl CredentialStore {
    /// Loads credentials from `path`.
    ///
    /// A missing file yields an empty store (every login then fails) and a
    /// warning. Any other I/O failure is returned as a configuration error.
    pub async fn load(path: &Path) -> Result<Self, ServerError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let store = Self::parse(&content);
                info!("🔑 Loaded {} credential(s) from {}", store.len(), path.display());
                Ok(store)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(
                    "⚠️ Credential file {} not found - all logins will be rejected",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(ServerError::Config(format!(
                "Failed to read credential file {}: {e}",
                path.display()
            ))),
        }
    }

    /// Parses credential file contents.
    ///
    /// The username ends at the first `:`; the password is the rest of the
    /// line and may itself contain colons. Lines missing either field are
    /// skipped. A later line for the same username replaces an earlier one.
    pub fn parse(content: &str) -> Self {
        let users = content
            .lines()
            .filter_map(|line| {
                let line = line.strip_suffix('\r').unwrap_or(line);
                let (username, password) = line.split_once(':')?;
                if username.is_empty() || password.is_empty() {
                    return None;
                }
                Some((username.to_string(), password.to_string()))
            })
            .collect();
        Self { users }
    }

    /// Exact, case-sensitive comparison against the stored password.
    pub fn authenticate(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|stored| stored == password)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
