//! Backend event handling.
//!
//! Every [`BackendEvent`] is dispatched here by the control loop.  Handlers
//! never propagate errors: faults are logged, shown to the user, and the
//! loop moves on.

use std::io::Write;
use std::path::PathBuf;

use qrcode::render::unicode::Dense1x2;
use qrcode::QrCode;
use tracing::{debug, error, info, warn};

use chatterm_backend::{AttachmentAction, BackendEvent};
use chatterm_shared::constants::RECENCY_WINDOW_SECS;
use chatterm_shared::{ConnectionState, Message};

use crate::session::SessionManager;

impl SessionManager {
    pub(crate) fn handle_event(&mut self, event: BackendEvent) {
        debug!(event = event.kind(), "backend event");

        match event {
            BackendEvent::Connected => {
                // Only an attempt started with `login` may complete.
                if matches!(
                    self.state.connection,
                    ConnectionState::Connecting | ConnectionState::AwaitingPairing
                ) {
                    self.state.next_pairing_attempt();
                    self.set_connection(ConnectionState::Connected);
                    self.set_connected(true);
                } else {
                    debug!(state = %self.state.connection, "ignoring connected outside an attempt");
                }
            }

            BackendEvent::Disconnected => {
                self.set_connection(ConnectionState::Disconnected);
                self.set_connected(false);
            }

            BackendEvent::LoggedOut { reason } => {
                warn!(reason = %reason, "logged out by server");
                self.ui.print_text(&format!("logged out: {reason}"));
                self.state.next_pairing_attempt();
                self.set_connection(ConnectionState::Disconnected);
                self.set_connected(false);
                self.spawn_backend("logout", |backend, _| async move {
                    backend.wipe_session().await
                });
            }

            BackendEvent::PairingCode(code) => self.on_pairing_code(code),

            BackendEvent::PairingSucceeded => {
                if matches!(
                    self.state.connection,
                    ConnectionState::Connecting | ConnectionState::AwaitingPairing
                ) {
                    info!("pairing succeeded");
                    self.ui.print_text("pairing succeeded");
                    self.state.next_pairing_attempt();
                    self.set_connection(ConnectionState::Connected);
                    self.set_connected(true);
                } else {
                    debug!(state = %self.state.connection, "ignoring late pairing success");
                }
            }

            BackendEvent::PairingFailed(reason) => {
                if matches!(
                    self.state.connection,
                    ConnectionState::Connecting | ConnectionState::AwaitingPairing
                ) {
                    warn!(reason = %reason, "pairing failed");
                    self.ui.print_error(&format!("pairing failed: {reason}"));
                    self.state.next_pairing_attempt();
                    self.set_connection(ConnectionState::Disconnected);
                    self.set_connected(false);
                } else {
                    debug!(reason = %reason, "ignoring pairing failure outside pairing");
                }
            }

            BackendEvent::PairingTimedOut { attempt } => self.on_pairing_timeout(attempt),

            BackendEvent::ConnectFailed(reason) => {
                warn!(reason = %reason, "connect failed");
                self.ui.print_error(&format!("connection failed: {reason}"));
                self.ui.print_text("try /reset to start over with a new pairing");
                self.state.next_pairing_attempt();
                self.set_connection(ConnectionState::Disconnected);
                self.set_connected(false);
            }

            BackendEvent::Message(message) | BackendEvent::MessageSent(message) => {
                self.handle_message(message)
            }

            BackendEvent::Battery {
                charge,
                loading,
                powersave,
            } => {
                self.state.status.battery_charge = charge;
                self.state.status.battery_loading = loading;
                self.state.status.battery_powersave = powersave;
                self.push_status();
            }

            BackendEvent::LastSeen(last_seen) => {
                self.state.status.last_seen = last_seen;
                self.push_status();
            }

            BackendEvent::ContactSnapshot(contacts) => {
                let mut failed = 0usize;
                for contact in &contacts {
                    if let Err(e) = self.store.upsert_contact(contact) {
                        error!(id = %contact.id, error = %e, "could not store contact");
                        failed += 1;
                    }
                }
                info!(count = contacts.len(), failed, "contact snapshot applied");
                self.push_chats();
                self.refresh_screen();
            }

            BackendEvent::ChatSnapshot(chats) => {
                let mut failed = 0usize;
                for chat in &chats {
                    if let Err(e) = self.store.upsert_chat(chat) {
                        error!(id = %chat.id, error = %e, "could not store chat");
                        failed += 1;
                    }
                }
                info!(count = chats.len(), failed, "chat snapshot applied");
                self.push_chats();
            }

            BackendEvent::Error(message) => {
                warn!(error = %message, "backend error");
                self.ui.print_error(&message);
            }

            BackendEvent::CommandFailed { command, error } => {
                self.ui.print_error(&format!("{command} failed: {error}"));
            }

            BackendEvent::DownloadFinished {
                message_id,
                path,
                action,
            } => self.on_download_finished(&message_id, path, action),
        }
    }

    /// Store, render, account and notify for one message, in that order.
    pub(crate) fn handle_message(&mut self, message: Message) {
        let is_new = match self.store.insert(&message) {
            Ok(is_new) => is_new,
            Err(e) => {
                error!(id = %message.id, error = %e, "could not store message");
                self.ui.print_error(&format!("could not store message: {e}"));
                return;
            }
        };

        let in_selected = self.state.is_selected(&message.chat_id);
        if in_selected {
            if is_new {
                let rendered = self
                    .store
                    .get_message(&message.id)
                    .ok()
                    .flatten()
                    .unwrap_or_else(|| message.clone());
                self.ui.new_message(&rendered);
            } else {
                // Duplicate or out-of-order delivery: redraw everything.
                self.refresh_screen();
            }
        }

        if is_new && !message.from_me && !in_selected && is_recent(message.timestamp) {
            if let Err(e) = self.store.mark_unread(&message.chat_id) {
                error!(chat = %message.chat_id, error = %e, "could not mark chat unread");
            }
            let title = self.store.resolve_short_name(&message.chat_id);
            let sender = self.store.resolve_short_name(&message.contact_id);
            let body = if message.has_media() && message.text.is_empty() {
                format!("{sender}: [attachment]")
            } else {
                format!("{sender}: {}", message.text)
            };
            self.notifier.notify(self.ui.as_ref(), &title, &body);
        }

        self.push_chats();
    }

    fn on_pairing_code(&mut self, code: String) {
        if !matches!(
            self.state.connection,
            ConnectionState::Connecting | ConnectionState::AwaitingPairing
        ) {
            debug!(state = %self.state.connection, "ignoring pairing code");
            return;
        }

        self.set_connection(ConnectionState::AwaitingPairing);
        self.ui
            .print_text("scan this code with your phone to log in:");
        match pairing_qr(&code) {
            Some(qr) => {
                let mut out = self.ui.writer();
                if let Err(e) = writeln!(out, "{qr}").and_then(|_| out.flush()) {
                    warn!(error = %e, "could not write pairing qr code");
                }
            }
            None => debug!("pairing code does not fit a qr code"),
        }
        self.ui.print_text(&format!("pairing code: {code}"));

        if !self.state.pairing_timer_armed {
            self.state.pairing_timer_armed = true;
            let attempt = self.state.pairing_attempt;
            self.schedule(
                self.settings.pairing_timeout,
                BackendEvent::PairingTimedOut { attempt },
            );
        }
    }

    fn on_pairing_timeout(&mut self, attempt: u64) {
        if attempt != self.state.pairing_attempt
            || self.state.connection != ConnectionState::AwaitingPairing
        {
            debug!(attempt, current = self.state.pairing_attempt, "stale pairing timeout");
            return;
        }

        warn!(attempt, "pairing timed out");
        self.ui.print_error("pairing timed out");
        self.state.next_pairing_attempt();
        self.set_connection(ConnectionState::Disconnected);
        self.set_connected(false);
        self.spawn_backend("login", |backend, _| async move { backend.stop().await });
    }

    pub(crate) fn on_download_finished(&mut self, message_id: &str, path: PathBuf, action: AttachmentAction) {
        debug!(id = %message_id, path = %path.display(), ?action, "attachment ready");
        match action {
            AttachmentAction::Save => {
                self.ui.print_text(&format!("saved to {}", path.display()));
            }
            AttachmentAction::Open => self.ui.open_file(&path),
            AttachmentAction::Show => self.ui.print_file(&path),
        }
    }
}

/// Terminal rendering of `code`, light modules drawn as blocks so it scans
/// on dark backgrounds.
pub(crate) fn pairing_qr(code: &str) -> Option<String> {
    let qr = QrCode::new(code.as_bytes()).ok()?;
    Some(
        qr.render::<Dense1x2>()
            .dark_color(Dense1x2::Light)
            .light_color(Dense1x2::Dark)
            .quiet_zone(true)
            .build(),
    )
}

/// Whether a message timestamp is inside the live window.
pub(crate) fn is_recent(timestamp: u64) -> bool {
    let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
    timestamp.saturating_add(RECENCY_WINDOW_SECS) > now
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recency_window() {
        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap();
        assert!(is_recent(now));
        assert!(is_recent(now + 100));
        assert!(is_recent(now - 10));
        assert!(!is_recent(now - 60));
        assert!(!is_recent(0));
    }

    #[test]
    fn pairing_qr_is_a_block_drawing() {
        let qr = pairing_qr("2@abcDEF123,token,key").unwrap();
        assert!(qr.lines().count() > 10);
        assert!(qr.contains('\u{2588}') || qr.contains('\u{2580}'));
        let width = qr.lines().next().unwrap().chars().count();
        assert!(qr.lines().all(|line| line.chars().count() == width));
    }
}
