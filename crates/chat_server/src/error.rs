//! Error types and handling for the chat server.
//!
//! Two families live here. [`ServerError`] covers infrastructure failures
//! (binding, configuration, socket I/O) that end a connection or stop the
//! server. [`ChatError`] is the per-command taxonomy a client can trigger;
//! none of its variants are fatal to the server process, and each one's
//! `Display` output is the exact line sent back to the client.

/// Enumeration of possible server errors.
///
/// Categorizes errors into network-related, configuration and internal
/// server errors to help with debugging and error handling.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Network-related errors such as binding failures or connection issues
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration errors, including an unreadable credential file
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Client-visible command failures.
///
/// `AuthenticationFailed` is terminal for the connection; every other
/// variant is reported to the issuing client and the connection stays open.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("Authentication failed.")]
    AuthenticationFailed,

    /// A second login for a username that is already online.
    #[error("Authentication failed.")]
    AlreadyOnline(String),

    #[error("ERROR: User not found or not online.")]
    UserNotFound(String),

    #[error("ERROR: Group does not exist.")]
    GroupNotFound(String),

    #[error("ERROR: Group already exists.")]
    AlreadyExists(String),

    #[error("ERROR: Group not joined.")]
    NotAMember(String),

    /// Missing or empty arguments. Carries the usage text for the command.
    #[error("ERROR: {0}")]
    MalformedCommand(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_errors_render_as_protocol_replies() {
        assert_eq!(
            ChatError::UserNotFound("carol".into()).to_string(),
            "ERROR: User not found or not online."
        );
        assert_eq!(
            ChatError::NotAMember("team".into()).to_string(),
            "ERROR: Group not joined."
        );
        assert_eq!(
            ChatError::MalformedCommand("Usage: /broadcast <message>").to_string(),
            "ERROR: Usage: /broadcast <message>"
        );
        assert_eq!(
            ChatError::AlreadyOnline("alice".into()).to_string(),
            ChatError::AuthenticationFailed.to_string()
        );
    }
}
