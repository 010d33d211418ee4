//! Line framing, command dispatch and message routing.
//!
//! This module turns raw client bytes into lines ([`codec`]), lines into
//! commands ([`command`]), and commands into deliveries ([`router`]).

pub mod codec;
pub mod command;
pub mod router;

pub use codec::{InboundLine, LineCodec};
pub use command::{Command, CommandDispatcher, CommandOutcome};
pub use router::MessageRouter;
