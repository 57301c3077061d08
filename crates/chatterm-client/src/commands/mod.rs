//! UI command handlers.
//!
//! Each sub-module groups related commands by domain.  [`SessionManager::handle_command`]
//! is the single dispatch point; handlers never block and never fail: usage
//! problems and missing preconditions are reported inline.

pub mod chats;
pub mod files;
pub mod messaging;
pub mod network;

use tracing::{debug, warn};

use chatterm_backend::AttachmentAction;
use chatterm_shared::Command;

use crate::session::{Flow, SessionManager};

/// `(name, usage, description)` for every command, in help order.
pub const COMMANDS: &[(&str, &str, &str)] = &[
    ("login", "", "connect to the network, pairing if needed (alias: connect)"),
    ("disconnect", "", "close the connection, keep the session"),
    ("logout", "", "close the connection and forget the session"),
    ("reset", "", "logout and clear the selected chat"),
    ("select", "<chat>", "open a chat"),
    ("send", "<chat> <text...>", "send a text message"),
    ("read", "", "mark the selected chat as read"),
    ("backlog", "", "fetch older messages for the selected chat"),
    ("info", "<message>", "show details of a message"),
    ("download", "<message>", "save an attachment to the download path"),
    ("open", "<message>", "download an attachment and open it"),
    ("show", "<message>", "download an attachment and render it"),
    ("name", "<chat> <name...>", "set a custom chat name"),
    ("chats", "", "refresh the chat list"),
    ("help", "", "list commands"),
    ("quit", "", "exit"),
];

impl SessionManager {
    pub(crate) fn handle_command(&mut self, cmd: Command) -> Flow {
        debug!(command = %cmd.name, params = cmd.params.len(), "command");

        match cmd.name.as_str() {
            "login" | "connect" => self.login(),
            "disconnect" => self.disconnect(),
            "logout" => self.logout(),
            "reset" => self.reset(),
            "select" => self.select(&cmd.params),
            "send" => self.send(&cmd.params),
            "read" => self.read(),
            "backlog" => self.backlog(),
            "info" => self.info(&cmd.params),
            "download" => self.fetch_attachment(&cmd.params, AttachmentAction::Save),
            "open" => self.fetch_attachment(&cmd.params, AttachmentAction::Open),
            "show" => self.fetch_attachment(&cmd.params, AttachmentAction::Show),
            "name" => self.rename(&cmd.params),
            "chats" => self.push_chats(),
            "help" => self.help(),
            "quit" | "exit" => return Flow::Quit,
            other => {
                warn!(command = %other, "unknown command");
                self.ui.print_error(&format!("unknown command: {other}"));
            }
        }
        Flow::Continue
    }

    pub(crate) fn usage(&self, command: &str) {
        let usage = COMMANDS
            .iter()
            .find(|(name, _, _)| *name == command)
            .map(|(_, usage, _)| *usage)
            .unwrap_or_default();
        self.ui.print_error(&format!("usage: {command} {usage}"));
    }

    /// Report and return `false` unless connected.
    pub(crate) fn require_connected(&self) -> bool {
        if !self.is_connected() {
            self.ui.print_error("not connected");
        }
        self.is_connected()
    }

    /// Report and return `None` unless a chat is selected.
    pub(crate) fn require_selected(&self) -> Option<String> {
        let selected = self.state.selected_chat.clone();
        if selected.is_none() {
            self.ui.print_error("no chat selected");
        }
        selected
    }

    fn help(&self) {
        let mut out = String::from("commands:");
        for (name, usage, description) in COMMANDS {
            let head = if usage.is_empty() {
                (*name).to_string()
            } else {
                format!("{name} {usage}")
            };
            out.push_str(&format!("\n  {head:<28} {description}"));
        }
        self.ui.print_text(&out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_dispatched_command_has_help() {
        for name in [
            "login", "disconnect", "logout", "reset", "select", "send", "read", "backlog", "info",
            "download", "open", "show", "name", "chats", "help", "quit",
        ] {
            assert!(COMMANDS.iter().any(|(n, _, _)| *n == name), "{name}");
        }
    }
}
