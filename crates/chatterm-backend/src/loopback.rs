//! Self-contained backend that talks to no network.
//!
//! The backend state lives in a dedicated tokio task.  Trait calls are turned
//! into [`LoopbackCommand`]s on a bounded channel and answered through
//! oneshot replies; everything observable goes out as [`BackendEvent`]s.
//! Outgoing messages are echoed back as `MessageSent`, `backlog` replays the
//! recorded history, and attachments are served from their first payload.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use chatterm_shared::constants::{APP_NAME, COMMAND_CHANNEL_CAPACITY, DEFAULT_BACKLOG_QUANTITY};
use chatterm_shared::{Chat, Contact, Message};

use crate::backend::Backend;
use crate::credentials::{random_token, Credentials};
use crate::error::{BackendError, Result};
use crate::events::BackendEvent;

/// Account id used for our own messages when none is configured.
pub const DEFAULT_OWN_ID: &str = "me@s.whatsapp.net";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoopbackConfig {
    /// Where the credential blob is kept.
    pub session_path: PathBuf,
    pub own_id: String,
    pub device_name: String,
    /// Complete pairing immediately instead of waiting for
    /// [`LoopbackBackend::confirm_pairing`].
    pub auto_pair: bool,
}

impl LoopbackConfig {
    pub fn new(session_path: impl Into<PathBuf>) -> Self {
        Self {
            session_path: session_path.into(),
            own_id: DEFAULT_OWN_ID.to_string(),
            device_name: APP_NAME.to_string(),
            auto_pair: false,
        }
    }

    pub fn auto_pair(mut self, auto_pair: bool) -> Self {
        self.auto_pair = auto_pair;
        self
    }
}

// ---------------------------------------------------------------------------
// Command types
// ---------------------------------------------------------------------------

type Reply = oneshot::Sender<Result<()>>;

/// Commands sent *into* the loopback task.
#[derive(Debug)]
enum LoopbackCommand {
    Send {
        chat_id: String,
        text: String,
        reply: Reply,
    },
    Backlog {
        chat_id: String,
        count: usize,
        reply: Reply,
    },
    Download {
        message: Box<Message>,
        dest: PathBuf,
        reply: Reply,
    },
    /// The user confirmed the pairing code on their primary device.
    ConfirmPairing,
    /// Shut the task down; the sender is dropped once it has finished.
    Shutdown(oneshot::Sender<()>),
}

/// Data the fake network knows about.  Survives restarts of the task.
#[derive(Debug, Default)]
struct Directory {
    history: Vec<Message>,
    contacts: Vec<Contact>,
    chats: Vec<Chat>,
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

pub struct LoopbackBackend {
    config: LoopbackConfig,
    directory: Arc<Mutex<Directory>>,
    cmd_tx: Mutex<Option<mpsc::Sender<LoopbackCommand>>>,
}

impl LoopbackBackend {
    pub fn new(config: LoopbackConfig) -> Self {
        Self {
            config,
            directory: Arc::new(Mutex::new(Directory::default())),
            cmd_tx: Mutex::new(None),
        }
    }

    /// Seed the history served by `backlog`.
    pub fn with_history(self, history: Vec<Message>) -> Self {
        if let Ok(mut dir) = self.directory.lock() {
            dir.history = history;
        }
        self
    }

    /// Seed the contact snapshot sent on connect.
    pub fn with_contacts(self, contacts: Vec<Contact>) -> Self {
        if let Ok(mut dir) = self.directory.lock() {
            dir.contacts = contacts;
        }
        self
    }

    /// Seed the chat snapshot sent on connect.
    pub fn with_chats(self, chats: Vec<Chat>) -> Self {
        if let Ok(mut dir) = self.directory.lock() {
            dir.chats = chats;
        }
        self
    }

    pub fn config(&self) -> &LoopbackConfig {
        &self.config
    }

    /// Recorded history, oldest first.
    pub fn history(&self) -> Vec<Message> {
        self.directory
            .lock()
            .map(|dir| dir.history.clone())
            .unwrap_or_default()
    }

    /// Complete a pending pairing.
    pub async fn confirm_pairing(&self) -> Result<()> {
        self.sender()?
            .send(LoopbackCommand::ConfirmPairing)
            .await
            .map_err(|_| BackendError::Closed)
    }

    fn sender(&self) -> Result<mpsc::Sender<LoopbackCommand>> {
        let guard = self
            .cmd_tx
            .lock()
            .map_err(|_| BackendError::Other("backend lock poisoned".into()))?;
        match guard.as_ref() {
            Some(tx) if !tx.is_closed() => Ok(tx.clone()),
            _ => Err(BackendError::NotConnected),
        }
    }

    async fn request(&self, build: impl FnOnce(Reply) -> LoopbackCommand) -> Result<()> {
        let tx = self.sender()?;
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(build(reply_tx))
            .await
            .map_err(|_| BackendError::Closed)?;
        reply_rx.await.map_err(|_| BackendError::Closed)?
    }
}

#[async_trait]
impl Backend for LoopbackBackend {
    async fn start(&self, events: mpsc::Sender<BackendEvent>) -> Result<()> {
        let mut guard = self
            .cmd_tx
            .lock()
            .map_err(|_| BackendError::Other("backend lock poisoned".into()))?;

        if guard.as_ref().is_some_and(|tx| !tx.is_closed()) {
            debug!("loopback backend already running");
            return Ok(());
        }

        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        *guard = Some(cmd_tx);

        tokio::spawn(run(
            self.config.clone(),
            Arc::clone(&self.directory),
            events,
            cmd_rx,
        ));
        info!(session = %self.config.session_path.display(), "loopback backend started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let tx = match self.cmd_tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => return Err(BackendError::Other("backend lock poisoned".into())),
        };
        let Some(tx) = tx else {
            return Ok(());
        };

        let (done_tx, done_rx) = oneshot::channel();
        if tx.send(LoopbackCommand::Shutdown(done_tx)).await.is_ok() {
            let _ = done_rx.await;
        }
        Ok(())
    }

    async fn send_command(&self, name: &str, params: &[String]) -> Result<()> {
        match name {
            "send" => {
                if params.len() < 2 {
                    return Err(BackendError::Usage("send <chat> <text>".into()));
                }
                let chat_id = params[0].clone();
                let text = params[1..].join(" ");
                self.request(|reply| LoopbackCommand::Send {
                    chat_id,
                    text,
                    reply,
                })
                .await
            }
            "backlog" => {
                let Some(chat_id) = params.first().cloned() else {
                    return Err(BackendError::Usage("backlog <chat> [count]".into()));
                };
                let count = match params.get(1) {
                    Some(raw) => raw
                        .parse()
                        .map_err(|_| BackendError::Usage("backlog <chat> [count]".into()))?,
                    None => DEFAULT_BACKLOG_QUANTITY,
                };
                self.request(|reply| LoopbackCommand::Backlog {
                    chat_id,
                    count,
                    reply,
                })
                .await
            }
            other => Err(BackendError::UnknownCommand(other.to_string())),
        }
    }

    async fn download_attachment(&self, message: &Message, dest: &Path) -> Result<()> {
        let message = Box::new(message.clone());
        let dest = dest.to_path_buf();
        self.request(|reply| LoopbackCommand::Download {
            message,
            dest,
            reply,
        })
        .await
    }

    async fn wipe_session(&self) -> Result<()> {
        if Credentials::wipe(&self.config.session_path)? {
            info!(path = %self.config.session_path.display(), "session credentials removed");
        } else {
            debug!("no session credentials to remove");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

async fn run(
    config: LoopbackConfig,
    directory: Arc<Mutex<Directory>>,
    events: mpsc::Sender<BackendEvent>,
    mut cmd_rx: mpsc::Receiver<LoopbackCommand>,
) {
    let mut connected = match Credentials::load(&config.session_path) {
        Ok(Some(creds)) => {
            info!(client = %creds.client_id, "resuming stored session");
            announce(&directory, &events).await;
            true
        }
        Ok(None) => {
            let code = format!("{},{}", random_token(12), random_token(32));
            let _ = events.send(BackendEvent::PairingCode(code)).await;
            config.auto_pair && pair(&config, &directory, &events).await
        }
        Err(e) => {
            warn!(error = %e, "could not read session credentials");
            let _ = events.send(BackendEvent::ConnectFailed(e.to_string())).await;
            return;
        }
    };

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            LoopbackCommand::Send {
                chat_id,
                text,
                reply,
            } => {
                if !connected {
                    let _ = reply.send(Err(BackendError::NotConnected));
                    continue;
                }
                let mut message = Message::text(
                    uuid::Uuid::new_v4().to_string(),
                    chat_id,
                    config.own_id.clone(),
                    now(),
                    text,
                );
                message.from_me = true;
                record(&directory, &message);

                debug!(id = %message.id, chat = %message.chat_id, "echoing sent message");
                let _ = reply.send(Ok(()));
                let _ = events.send(BackendEvent::MessageSent(message)).await;
            }

            LoopbackCommand::Backlog {
                chat_id,
                count,
                reply,
            } => {
                if !connected {
                    let _ = reply.send(Err(BackendError::NotConnected));
                    continue;
                }
                let older = backlog(&directory, &chat_id, count);
                debug!(chat = %chat_id, count = older.len(), "replaying backlog");
                let _ = reply.send(Ok(()));
                for message in older {
                    let _ = events.send(BackendEvent::Message(message)).await;
                }
            }

            LoopbackCommand::Download {
                message,
                dest,
                reply,
            } => {
                let result = if connected {
                    write_attachment(&message, &dest).await
                } else {
                    Err(BackendError::NotConnected)
                };
                let _ = reply.send(result);
            }

            LoopbackCommand::ConfirmPairing => {
                if !connected {
                    connected = pair(&config, &directory, &events).await;
                }
            }

            LoopbackCommand::Shutdown(done) => {
                info!("loopback shutdown requested");
                let event = if connected {
                    BackendEvent::Disconnected
                } else {
                    BackendEvent::PairingFailed("pairing cancelled".into())
                };
                let _ = events.send(event).await;
                let _ = done.send(());
                break;
            }
        }
    }

    info!("loopback event loop terminated");
}

/// Persist fresh credentials and announce the connection.
async fn pair(
    config: &LoopbackConfig,
    directory: &Mutex<Directory>,
    events: &mpsc::Sender<BackendEvent>,
) -> bool {
    let creds = Credentials::generate(config.own_id.clone(), config.device_name.clone());
    if let Err(e) = creds.save(&config.session_path) {
        warn!(error = %e, "could not persist session credentials");
        let _ = events.send(BackendEvent::PairingFailed(e.to_string())).await;
        return false;
    }

    info!(client = %creds.client_id, "pairing complete");
    let _ = events.send(BackendEvent::PairingSucceeded).await;
    announce(directory, events).await;
    true
}

async fn announce(directory: &Mutex<Directory>, events: &mpsc::Sender<BackendEvent>) {
    let (contacts, chats) = directory
        .lock()
        .map(|dir| (dir.contacts.clone(), dir.chats.clone()))
        .unwrap_or_default();

    let _ = events.send(BackendEvent::Connected).await;
    let _ = events.send(BackendEvent::ContactSnapshot(contacts)).await;
    let _ = events.send(BackendEvent::ChatSnapshot(chats)).await;
    let _ = events
        .send(BackendEvent::Battery {
            charge: 100,
            loading: false,
            powersave: false,
        })
        .await;
}

fn record(directory: &Mutex<Directory>, message: &Message) {
    if let Ok(mut dir) = directory.lock() {
        if !dir.history.iter().any(|m| m.id == message.id) {
            dir.history.push(message.clone());
        }
    }
}

/// The last `count` recorded messages of a chat, oldest first.
fn backlog(directory: &Mutex<Directory>, chat_id: &str, count: usize) -> Vec<Message> {
    let Ok(dir) = directory.lock() else {
        return Vec::new();
    };
    let in_chat: Vec<&Message> = dir.history.iter().filter(|m| m.chat_id == chat_id).collect();
    let skip = in_chat.len().saturating_sub(count);
    in_chat.into_iter().skip(skip).cloned().collect()
}

async fn write_attachment(message: &Message, dest: &Path) -> Result<()> {
    let data = message
        .media
        .as_ref()
        .filter(|_| message.has_media())
        .map(|media| media.payload(0))
        .filter(|data| !data.is_empty())
        .ok_or_else(|| BackendError::MediaUnavailable(message.id.clone()))?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(dest, data).await?;
    debug!(id = %message.id, path = %dest.display(), bytes = data.len(), "attachment written");
    Ok(())
}

fn now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chatterm_shared::MediaRef;

    use super::*;

    async fn next(rx: &mut mpsc::Receiver<BackendEvent>) -> BackendEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    fn backend(dir: &tempfile::TempDir, auto_pair: bool) -> LoopbackBackend {
        LoopbackBackend::new(
            LoopbackConfig::new(dir.path().join("session.json")).auto_pair(auto_pair),
        )
    }

    async fn started(b: &LoopbackBackend) -> mpsc::Receiver<BackendEvent> {
        let (tx, mut rx) = mpsc::channel(64);
        b.start(tx).await.unwrap();
        // Drain the connect sequence.
        loop {
            if let BackendEvent::Battery { .. } = next(&mut rx).await {
                return rx;
            }
        }
    }

    #[tokio::test]
    async fn auto_pair_persists_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let b = backend(&dir, true);
        let (tx, mut rx) = mpsc::channel(64);
        b.start(tx).await.unwrap();

        assert!(matches!(next(&mut rx).await, BackendEvent::PairingCode(_)));
        assert_eq!(next(&mut rx).await, BackendEvent::PairingSucceeded);
        assert_eq!(next(&mut rx).await, BackendEvent::Connected);
        assert!(matches!(next(&mut rx).await, BackendEvent::ContactSnapshot(_)));
        assert!(matches!(next(&mut rx).await, BackendEvent::ChatSnapshot(_)));
        assert!(matches!(next(&mut rx).await, BackendEvent::Battery { .. }));
        assert!(dir.path().join("session.json").exists());
    }

    #[tokio::test]
    async fn stored_credentials_skip_pairing() {
        let dir = tempfile::tempdir().unwrap();
        Credentials::generate(DEFAULT_OWN_ID, "test")
            .save(&dir.path().join("session.json"))
            .unwrap();

        let b = backend(&dir, false);
        let (tx, mut rx) = mpsc::channel(64);
        b.start(tx).await.unwrap();
        assert_eq!(next(&mut rx).await, BackendEvent::Connected);
    }

    #[tokio::test]
    async fn manual_pairing_and_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let b = backend(&dir, false);
        let (tx, mut rx) = mpsc::channel(64);
        b.start(tx).await.unwrap();
        assert!(matches!(next(&mut rx).await, BackendEvent::PairingCode(_)));

        b.stop().await.unwrap();
        assert!(matches!(next(&mut rx).await, BackendEvent::PairingFailed(_)));
        assert!(!dir.path().join("session.json").exists());

        let (tx, mut rx) = mpsc::channel(64);
        b.start(tx).await.unwrap();
        assert!(matches!(next(&mut rx).await, BackendEvent::PairingCode(_)));
        b.confirm_pairing().await.unwrap();
        assert_eq!(next(&mut rx).await, BackendEvent::PairingSucceeded);
        assert_eq!(next(&mut rx).await, BackendEvent::Connected);
    }

    #[tokio::test]
    async fn send_echoes_with_fresh_id() {
        let dir = tempfile::tempdir().unwrap();
        let b = backend(&dir, true);
        let mut rx = started(&b).await;

        b.send_command("send", &["bob@s.whatsapp.net".into(), "hello".into(), "there".into()])
            .await
            .unwrap();

        match next(&mut rx).await {
            BackendEvent::MessageSent(m) => {
                assert_eq!(m.chat_id, "bob@s.whatsapp.net");
                assert_eq!(m.text, "hello there");
                assert!(m.from_me);
                assert_eq!(m.id.len(), 36);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(b.history().len(), 1);
    }

    #[tokio::test]
    async fn command_errors() {
        let dir = tempfile::tempdir().unwrap();
        let b = backend(&dir, true);

        let err = b
            .send_command("send", &["chat".into(), "text".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotConnected));

        let _rx = started(&b).await;
        assert!(matches!(
            b.send_command("send", &["chat".into()]).await.unwrap_err(),
            BackendError::Usage(_)
        ));
        assert!(matches!(
            b.send_command("frobnicate", &[]).await.unwrap_err(),
            BackendError::UnknownCommand(_)
        ));
        assert!(matches!(
            b.send_command("backlog", &["chat".into(), "many".into()])
                .await
                .unwrap_err(),
            BackendError::Usage(_)
        ));
    }

    #[tokio::test]
    async fn backlog_replays_latest_history() {
        let dir = tempfile::tempdir().unwrap();
        let history = (1..=5)
            .map(|i| Message::text(format!("m{i}"), "chat", "bob", i, "old"))
            .chain(std::iter::once(Message::text("x", "other", "bob", 9, "no")))
            .collect();
        let b = backend(&dir, true).with_history(history);
        let mut rx = started(&b).await;

        b.send_command("backlog", &["chat".into(), "2".into()])
            .await
            .unwrap();

        let mut ids = Vec::new();
        for _ in 0..2 {
            match next(&mut rx).await {
                BackendEvent::Message(m) => ids.push(m.id),
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(ids, vec!["m4", "m5"]);
    }

    #[tokio::test]
    async fn download_writes_first_payload() {
        let dir = tempfile::tempdir().unwrap();
        let b = backend(&dir, true);
        let _rx = started(&b).await;

        let mut msg = Message::text("m1", "chat", "bob", 1, "[IMAGE]");
        let dest = dir.path().join("downloads").join("m1.jpg");
        assert!(matches!(
            b.download_attachment(&msg, &dest).await.unwrap_err(),
            BackendError::MediaUnavailable(_)
        ));

        msg.media = Some(MediaRef::new("/v/1", "image/jpeg", vec![b"jpegbytes".to_vec()]));
        b.download_attachment(&msg, &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"jpegbytes");
    }

    #[tokio::test]
    async fn wipe_session_keeps_running_state_out() {
        let dir = tempfile::tempdir().unwrap();
        let b = backend(&dir, true);
        let mut rx = started(&b).await;

        b.stop().await.unwrap();
        assert_eq!(next(&mut rx).await, BackendEvent::Disconnected);

        b.wipe_session().await.unwrap();
        assert!(!dir.path().join("session.json").exists());
        b.wipe_session().await.unwrap();
    }
}
