//! Core server implementation and connection handling.
//!
//! This module contains the main chat server structure and the logic
//! for handling client connections and server lifecycle management.

pub mod core;
pub(crate) mod handlers;

pub use self::core::ChatServer;
