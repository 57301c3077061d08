//! Chat navigation: select, read, name.

use tracing::{error, info};

use crate::session::SessionManager;

impl SessionManager {
    pub(crate) fn select(&mut self, params: &[String]) {
        let [raw] = params else {
            self.usage("select");
            return;
        };

        let chat_id = raw.clone();
        info!(chat = %chat_id, "chat selected");
        self.state.selected_chat = Some(chat_id);
        self.refresh_screen();
    }

    pub(crate) fn read(&mut self) {
        let Some(chat_id) = self.require_selected() else {
            return;
        };

        if let Err(e) = self.store.reset_unread(&chat_id) {
            error!(chat = %chat_id, error = %e, "could not reset unread");
            self.ui.print_error(&format!("could not mark chat read: {e}"));
            return;
        }
        self.push_chats();
    }

    pub(crate) fn rename(&mut self, params: &[String]) {
        if params.len() < 2 {
            self.usage("name");
            return;
        }

        let chat_id = &params[0];
        let name = params[1..].join(" ");
        match self.store.rename_chat(chat_id, &name) {
            Ok(()) => {
                info!(chat = %chat_id, name = %name, "chat renamed");
                self.push_chats();
            }
            Err(e) => {
                error!(chat = %chat_id, error = %e, "could not rename chat");
                self.ui.print_error(&format!("could not rename chat: {e}"));
            }
        }
    }
}
