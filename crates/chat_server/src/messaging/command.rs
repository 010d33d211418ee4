//! Command parsing and dispatch.
//!
//! Every line an active client sends is matched against a fixed,
//! case-sensitive vocabulary keyed on its first word:
//!
//! | Command                          | Effect        |
//! |----------------------------------|---------------|
//! | `/msg <user> <text>`             | private send  |
//! | `/broadcast <text>`              | broadcast     |
//! | `/create_group <name>`           | create group  |
//! | `/join_group <name>`             | join group    |
//! | `/leave_group <name>`            | leave group   |
//! | `/group_msg <name> <text>`       | group send    |
//! | `/exit`                          | disconnect    |
//!
//! Anything else is silently ignored. Group names may contain spaces; for
//! `/group_msg` the name is found by longest-prefix match against the
//! groups that exist at the time of the call.

use super::router::MessageRouter;
use crate::connection::Participant;
use crate::error::ChatError;
use tracing::{debug, trace};

const MSG_USAGE: &str = "Usage: /msg <user> <message>";
const BROADCAST_USAGE: &str = "Usage: /broadcast <message>";
const CREATE_USAGE: &str = "Usage: /create_group <group name>";
const JOIN_USAGE: &str = "Usage: /join_group <group name>";
const LEAVE_USAGE: &str = "Usage: /leave_group <group name>";
const NO_GROUP: &str = "No group specified.";
const NO_GROUP_MESSAGE: &str = "No message provided for group message.";

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Msg { recipient: String, text: String },
    Broadcast { text: String },
    CreateGroup { name: String },
    JoinGroup { name: String },
    LeaveGroup { name: String },
    /// Group name and message are still joined; resolved at dispatch time.
    GroupMsg { args: String },
    Exit,
}

impl Command {
    /// Parses one line.
    ///
    /// Returns `Ok(None)` for lines outside the vocabulary and
    /// [`ChatError::MalformedCommand`] when a known command lacks arguments.
    pub fn parse(line: &str) -> Result<Option<Command>, ChatError> {
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));

        let command = match word {
            "/msg" => {
                let (recipient, text) = rest
                    .trim_start()
                    .split_once(char::is_whitespace)
                    .ok_or(ChatError::MalformedCommand(MSG_USAGE))?;
                if text.trim().is_empty() {
                    return Err(ChatError::MalformedCommand(MSG_USAGE));
                }
                Command::Msg {
                    recipient: recipient.to_string(),
                    text: text.to_string(),
                }
            }
            "/broadcast" => {
                if rest.trim().is_empty() {
                    return Err(ChatError::MalformedCommand(BROADCAST_USAGE));
                }
                Command::Broadcast {
                    text: rest.to_string(),
                }
            }
            "/create_group" => Command::CreateGroup {
                name: group_name(rest, CREATE_USAGE)?,
            },
            "/join_group" => Command::JoinGroup {
                name: group_name(rest, JOIN_USAGE)?,
            },
            "/leave_group" => Command::LeaveGroup {
                name: group_name(rest, LEAVE_USAGE)?,
            },
            "/group_msg" => {
                let args = rest.trim_start_matches(' ');
                if args.is_empty() {
                    return Err(ChatError::MalformedCommand(NO_GROUP));
                }
                Command::GroupMsg {
                    args: args.to_string(),
                }
            }
            "/exit" => Command::Exit,
            _ => return Ok(None),
        };
        Ok(Some(command))
    }

    fn name(&self) -> &'static str {
        match self {
            Command::Msg { .. } => "/msg",
            Command::Broadcast { .. } => "/broadcast",
            Command::CreateGroup { .. } => "/create_group",
            Command::JoinGroup { .. } => "/join_group",
            Command::LeaveGroup { .. } => "/leave_group",
            Command::GroupMsg { .. } => "/group_msg",
            Command::Exit => "/exit",
        }
    }
}

fn group_name(rest: &str, usage: &'static str) -> Result<String, ChatError> {
    let name = rest.trim();
    if name.is_empty() {
        return Err(ChatError::MalformedCommand(usage));
    }
    Ok(name.to_string())
}

/// What the connection handler should do after a line was dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Done; nothing to tell the sender
    Handled,
    /// Send this line back to the sender
    Reply(String),
    /// Not a command; dropped without a reply
    Ignored,
    /// The client asked to leave
    Exit,
}

impl From<ChatError> for CommandOutcome {
    fn from(err: ChatError) -> Self {
        CommandOutcome::Reply(err.to_string())
    }
}

/// Parses client lines and applies them through the router.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    router: MessageRouter,
}

impl CommandDispatcher {
    pub fn new(router: MessageRouter) -> Self {
        Self { router }
    }

    pub async fn dispatch(&self, from: &Participant, line: &str) -> CommandOutcome {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => {
                trace!("Ignoring unrecognized input from {}", from.username);
                return CommandOutcome::Ignored;
            }
            Err(err) => return err.into(),
        };
        debug!("{} issued {}", from.username, command.name());

        match self.execute(from, command).await {
            Ok(outcome) => outcome,
            Err(err) => err.into(),
        }
    }

    async fn execute(&self, from: &Participant, command: Command) -> Result<CommandOutcome, ChatError> {
        let groups = self.router.groups();
        let outcome = match command {
            Command::Msg { recipient, text } => {
                self.router.send_private(from, &recipient, &text).await?;
                CommandOutcome::Handled
            }
            Command::Broadcast { text } => {
                let line = format!("[{}]: {}", from.username, text);
                self.router.broadcast(from.id, &line).await;
                CommandOutcome::Handled
            }
            Command::CreateGroup { name } => {
                groups.create(&name).await?;
                CommandOutcome::Reply(format!("Group {name} created."))
            }
            Command::JoinGroup { name } => {
                groups.join(from.id, &name).await?;
                CommandOutcome::Reply(format!("You joined the group {name}."))
            }
            Command::LeaveGroup { name } => {
                groups.leave(from.id, &name).await?;
                CommandOutcome::Reply("Left group successfully.".to_string())
            }
            Command::GroupMsg { args } => {
                let (name, text) = groups.resolve_longest_prefix(&args).await?;
                if text.is_empty() {
                    return Err(ChatError::MalformedCommand(NO_GROUP_MESSAGE));
                }
                self.router.send_group(from, &name, &text).await?;
                CommandOutcome::Handled
            }
            Command::Exit => CommandOutcome::Exit,
        };
        Ok(outcome)
    }
}
