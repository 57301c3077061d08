//! Attachment commands: download, open, show.

use std::path::PathBuf;

use tracing::{debug, error, info};

use chatterm_backend::{AttachmentAction, BackendError, BackendEvent};
use chatterm_shared::Message;

use crate::session::SessionManager;

impl SessionManager {
    /// Fetch an attachment to disk, then act on it.
    ///
    /// A file that already exists at the target path is reused.
    pub(crate) fn fetch_attachment(&mut self, params: &[String], action: AttachmentAction) {
        let command = match action {
            AttachmentAction::Save => "download",
            AttachmentAction::Open => "open",
            AttachmentAction::Show => "show",
        };
        let [message_id] = params else {
            self.usage(command);
            return;
        };

        let message = match self.store.get_message(message_id) {
            Ok(Some(message)) => message,
            Ok(None) => {
                self.ui
                    .print_error(&format!("message not found: {message_id}"));
                return;
            }
            Err(e) => {
                error!(id = %message_id, error = %e, "could not load message");
                self.ui.print_error(&format!("could not load message: {e}"));
                return;
            }
        };
        if !message.has_media() {
            self.ui
                .print_error(&format!("message {message_id} has no attachment"));
            return;
        }

        let path = self.attachment_path(&message, action);
        if path.exists() {
            debug!(id = %message.id, path = %path.display(), "attachment already on disk");
            self.on_download_finished(&message.id, path, action);
            return;
        }
        if !self.require_connected() {
            return;
        }

        let finished = BackendEvent::DownloadFinished {
            message_id: message.id.clone(),
            path: path.clone(),
            action,
        };

        info!(id = %message.id, path = %path.display(), "downloading attachment");
        self.spawn_backend(command, move |backend, events| async move {
            backend.download_attachment(&message, &path).await?;
            let _ = events.send(finished).await;
            Ok::<(), BackendError>(())
        });
    }

    fn attachment_path(&self, message: &Message, action: AttachmentAction) -> PathBuf {
        let dir = match action {
            AttachmentAction::Save => &self.settings.download_path,
            AttachmentAction::Open | AttachmentAction::Show => &self.settings.preview_path,
        };
        let extension = message
            .media
            .as_ref()
            .map(|media| media.extension())
            .unwrap_or("bin");
        dir.join(format!("{}.{extension}", file_stem(&message.id)))
    }
}

/// Message ids are backend-assigned; keep only filename-safe characters.
fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_is_filesystem_safe() {
        assert_eq!(file_stem("3EB0/ab..c"), "3EB0_ab__c");
        assert_eq!(file_stem("uuid-1234"), "uuid-1234");
    }
}
