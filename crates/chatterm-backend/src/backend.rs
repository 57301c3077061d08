use std::path::Path;

use async_trait::async_trait;
use chatterm_shared::Message;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::events::BackendEvent;

/// Capability interface of a messaging network.
///
/// A backend never touches the message store or the UI.  Everything it
/// observes is reported as a [`BackendEvent`] on the sender handed to
/// [`Backend::start`]; the methods below only *request* work.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Begin connecting.  Progress (pairing, connected, failure) is reported
    /// through `events`.
    async fn start(&self, events: mpsc::Sender<BackendEvent>) -> Result<()>;

    /// Disconnect.  A backend that is not running returns `Ok`.
    async fn stop(&self) -> Result<()>;

    /// Issue a backend-level command, e.g. `send [chat, text]` or
    /// `backlog [chat, count]`.
    async fn send_command(&self, name: &str, params: &[String]) -> Result<()>;

    /// Fetch the attachment of `message` into the file at `dest`.
    async fn download_attachment(&self, message: &Message, dest: &Path) -> Result<()>;

    /// Delete stored session credentials.  Message history is not touched.
    async fn wipe_session(&self) -> Result<()>;
}
