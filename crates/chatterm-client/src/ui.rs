//! Render surface of the session.
//!
//! The session manager pushes structured data only; how a message or chat
//! list looks is entirely up to the implementation.  Every method is called
//! from the control loop and must return promptly.

use std::io::Write;
use std::path::Path;

use chatterm_shared::{Chat, Message, SessionStatus};

pub trait UiHandler: Send + Sync {
    /// Append one message to the open transcript.
    fn new_message(&self, message: &Message);

    /// Replace the open transcript.
    fn new_screen(&self, messages: &[Message]);

    /// Replace the chat list.
    fn set_chats(&self, chats: &[Chat]);

    fn print_error(&self, error: &str);

    fn print_text(&self, text: &str);

    /// Render a downloaded file in the terminal.
    fn print_file(&self, path: &Path);

    /// Hand a downloaded file to an external viewer.
    fn open_file(&self, path: &Path);

    fn set_status(&self, status: &SessionStatus);

    /// Raw sink for escape sequences such as the terminal bell.
    fn writer(&self) -> Box<dyn Write + Send>;
}
