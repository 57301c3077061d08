//! Message commands: send, backlog, info.

use tracing::info;

use crate::session::SessionManager;

impl SessionManager {
    /// Hand a text message to the backend.
    ///
    /// Nothing is stored here: the backend echoes the sent message as
    /// `MessageSent`, which goes through the normal inbound path.
    pub(crate) fn send(&mut self, params: &[String]) {
        if params.len() < 2 {
            self.usage("send");
            return;
        }
        if !self.require_connected() {
            return;
        }

        let chat_id = params[0].clone();
        let text = params[1..].join(" ");
        info!(chat = %chat_id, len = text.len(), "sending message");

        self.spawn_backend("send", move |backend, _| async move {
            backend.send_command("send", &[chat_id, text]).await
        });
    }

    pub(crate) fn backlog(&mut self) {
        let Some(chat_id) = self.require_selected() else {
            return;
        };
        if !self.require_connected() {
            return;
        }

        let count = self.settings.backlog_quantity.to_string();
        info!(chat = %chat_id, count = %count, "requesting backlog");
        self.ui.print_text("retrieving message history..");

        self.spawn_backend("backlog", move |backend, _| async move {
            backend.send_command("backlog", &[chat_id, count]).await
        });
    }

    pub(crate) fn info(&self, params: &[String]) {
        let [message_id] = params else {
            self.usage("info");
            return;
        };
        self.ui.print_text(&self.store.describe(message_id));
    }
}
