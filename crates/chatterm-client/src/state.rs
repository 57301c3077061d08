//! Mutable state owned by the session control loop.
//!
//! Only the loop task touches a [`SessionState`], so it needs no locking.

use chatterm_shared::{ConnectionState, SessionStatus};

#[derive(Debug, Default)]
pub struct SessionState {
    /// Connection lifecycle.  Mirrored into `status.state`.
    pub connection: ConnectionState,

    /// Status-bar projection pushed to the UI.
    pub status: SessionStatus,

    /// Chat currently shown in the transcript pane.
    pub selected_chat: Option<String>,

    /// Identifies the current pairing attempt.  A timeout carrying an older
    /// id is stale and ignored.
    pub pairing_attempt: u64,

    /// Whether a timeout timer is running for `pairing_attempt`.
    pub pairing_timer_armed: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_connection(&mut self, connection: ConnectionState) {
        self.connection = connection;
        self.status.state = connection;
    }

    /// Update the connectivity flag.  Returns `true` if it changed.
    pub fn set_connected(&mut self, connected: bool) -> bool {
        let changed = self.status.connected != connected;
        self.status.connected = connected;
        changed
    }

    /// Start a new pairing attempt, invalidating any running timer.
    pub fn next_pairing_attempt(&mut self) -> u64 {
        self.pairing_attempt += 1;
        self.pairing_timer_armed = false;
        self.pairing_attempt
    }

    pub fn is_selected(&self, chat_id: &str) -> bool {
        self.selected_chat.as_deref() == Some(chat_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_is_mirrored_into_status() {
        let mut state = SessionState::new();
        state.set_connection(ConnectionState::AwaitingPairing);
        assert_eq!(state.status.state, ConnectionState::AwaitingPairing);
    }

    #[test]
    fn connected_flag_reports_changes_only() {
        let mut state = SessionState::new();
        assert!(!state.set_connected(false));
        assert!(state.set_connected(true));
        assert!(!state.set_connected(true));
        assert!(state.set_connected(false));
    }

    #[test]
    fn pairing_attempts_are_monotonic() {
        let mut state = SessionState::new();
        state.pairing_timer_armed = true;
        assert_eq!(state.next_pairing_attempt(), 1);
        assert!(!state.pairing_timer_armed);
        assert_eq!(state.next_pairing_attempt(), 2);
    }
}
