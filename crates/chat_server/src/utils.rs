//! Factory functions for creating server instances.

use crate::{
    config::ServerConfig, credentials::CredentialStore, error::ServerError, server::ChatServer,
};

/// Creates a chat server with the default configuration and the given
/// accounts.
///
/// # Example
///
/// ```rust
/// use chat_server::{create_server, CredentialStore};
///
/// let server = create_server(CredentialStore::parse("alice:pw1\nbob:pw2\n"));
/// assert_eq!(server.config().bind_address.port(), 12345);
/// ```
pub fn create_server(credentials: CredentialStore) -> ChatServer {
    ChatServer::new(ServerConfig::default(), credentials)
}

/// Creates a chat server with a custom configuration.
///
/// # Example
///
/// ```rust
/// use chat_server::{create_server_with_config, CredentialStore, ServerConfig};
///
/// let config = ServerConfig {
///     bind_address: "127.0.0.1:9000".parse().unwrap(),
///     ..Default::default()
/// };
///
/// let server = create_server_with_config(config, CredentialStore::default());
/// ```
pub fn create_server_with_config(config: ServerConfig, credentials: CredentialStore) -> ChatServer {
    ChatServer::new(config, credentials)
}

/// Reads the credential file named in `config` and builds a server from it.
///
/// A missing file yields a server nobody can log in to; any other read
/// failure is a [`ServerError::Config`].
pub async fn load_server(config: ServerConfig) -> Result<ChatServer, ServerError> {
    let credentials = CredentialStore::load(&config.credentials_path).await?;
    Ok(ChatServer::new(config, credentials))
}
