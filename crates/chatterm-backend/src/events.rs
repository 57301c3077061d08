//! Everything that can happen *to* a session arrives as a [`BackendEvent`].
//!
//! Backends emit the connection, pairing and data variants.  The session
//! manager's own spawned tasks report their results through the same
//! channel using the loop-internal variants at the bottom of the enum, so
//! the control loop has exactly one place where state changes happen.

use std::path::PathBuf;

use chatterm_shared::{Chat, Contact, Message};

/// What to do with an attachment once it is on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentAction {
    /// Keep it in the download directory.
    Save,
    /// Hand it to the UI's external opener.
    Open,
    /// Render it inline in the terminal.
    Show,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    // --- connection lifecycle ---
    Connected,
    Disconnected,
    /// The server revoked the session; stored credentials are no longer valid.
    LoggedOut {
        reason: String,
    },
    /// A pairing code the user has to confirm on their primary device.
    PairingCode(String),
    PairingSucceeded,
    /// The pairing code channel closed without success.
    PairingFailed(String),
    ConnectFailed(String),

    // --- data ---
    /// Inbound message, or history delivered by the backend.
    Message(Message),
    /// Echo of a message this session sent.
    MessageSent(Message),
    Battery {
        charge: u8,
        loading: bool,
        powersave: bool,
    },
    LastSeen(String),
    ContactSnapshot(Vec<Contact>),
    ChatSnapshot(Vec<Chat>),
    Error(String),

    // --- loop-internal results ---
    CommandFailed {
        command: String,
        error: String,
    },
    DownloadFinished {
        message_id: String,
        path: PathBuf,
        action: AttachmentAction,
    },
    PairingTimedOut {
        attempt: u64,
    },
}

impl BackendEvent {
    /// Short name used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::LoggedOut { .. } => "logged_out",
            Self::PairingCode(_) => "pairing_code",
            Self::PairingSucceeded => "pairing_succeeded",
            Self::PairingFailed(_) => "pairing_failed",
            Self::ConnectFailed(_) => "connect_failed",
            Self::Message(_) => "message",
            Self::MessageSent(_) => "message_sent",
            Self::Battery { .. } => "battery",
            Self::LastSeen(_) => "last_seen",
            Self::ContactSnapshot(_) => "contact_snapshot",
            Self::ChatSnapshot(_) => "chat_snapshot",
            Self::Error(_) => "error",
            Self::CommandFailed { .. } => "command_failed",
            Self::DownloadFinished { .. } => "download_finished",
            Self::PairingTimedOut { .. } => "pairing_timed_out",
        }
    }
}
