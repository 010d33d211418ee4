//! # Chat Server - Multi-Client TCP Group Chat
//!
//! An in-memory, line-oriented chat server. Clients connect over plain TCP,
//! authenticate against a flat credential file, and then exchange messages
//! with everyone, with one other user, or with the members of a named group.
//!
//! ## Architecture Overview
//!
//! ### Core Components
//!
//! * **Credential Store** - `username:password` pairs loaded once at startup
//! * **Session Registry** - which username is logged in on which connection
//! * **Group Registry** - named groups and their member connections
//! * **Message Router** - broadcast, private and group delivery
//! * **Command Dispatcher** - parses `/` commands and applies them
//!
//! ### Connection Flow
//!
//! 1. Client connects; the server prompts for username and password
//! 2. Bad credentials get `Authentication failed.` and the socket is closed
//! 3. On success everyone else sees `<user> has joined the chat.`
//! 4. Each subsequent line is dispatched as a command
//! 5. On `/exit` or disconnect the user is removed from every registry and
//!    everyone still online sees `<user> has left the chat.`
//!
//! ### Commands
//!
//! ```text
//! /msg <user> <text>
//! /broadcast <text>
//! /create_group <name>
//! /join_group <name>
//! /leave_group <name>
//! /group_msg <name> <text>
//! /exit
//! ```
//!
//! ## Concurrency
//!
//! Each connection runs in its own task. The session registry and the group
//! registry are each guarded by a `tokio::sync::Mutex`. When an operation
//! needs both, the session lock is always acquired first.
//!
//! Messages for a client are pushed onto that client's outbound queue and
//! written by its own task, so one slow reader never holds up the others.
//!
//! ## Error Handling
//!
//! * [`ServerError`] - network, configuration and internal failures
//! * [`ChatError`] - per-command failures reported back to the client

pub use config::ServerConfig;
pub use credentials::CredentialStore;
pub use error::{ChatError, ServerError};
pub use server::ChatServer;
pub use shutdown::ShutdownState;
pub use utils::{create_server, create_server_with_config, load_server};

pub mod config;
pub mod connection;
pub mod credentials;
pub mod error;
pub mod groups;
pub mod messaging;
pub mod server;
pub mod shutdown;
pub mod utils;
