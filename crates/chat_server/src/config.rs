//! Server configuration types and defaults.
//!
//! This module contains the server configuration structure and default values
//! used to initialize and customize the chat server behavior.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default TCP port the chat server listens on.
pub const DEFAULT_PORT: u16 = 12345;

/// Default maximum length of one inbound line, in bytes.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

/// Configuration structure for the chat server.
///
/// Contains the network, credential and protocol parameters. There is no
/// connection limit and no read timeout: every accepted socket gets its own
/// task for as long as the peer keeps it open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Flat `username:password` file loaded once at startup
    pub credentials_path: PathBuf,

    /// Longest inbound line accepted, excluding the newline
    pub max_line_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            credentials_path: PathBuf::from("users.txt"),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}
