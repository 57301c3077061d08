#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use chatterm_backend::{Backend, BackendError, BackendEvent};
use chatterm_client::{ClientConfig, Notifier, NotifyMode, SessionManager, UiHandler};
use chatterm_shared::{Chat, Command, ConnectionState, Message, SessionStatus};
use chatterm_store::MessageStore;

// ---------------------------------------------------------------------------
// Recording UI
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum UiCall {
    NewMessage(Message),
    NewScreen(Vec<Message>),
    SetChats(Vec<Chat>),
    Error(String),
    Text(String),
    PrintFile(PathBuf),
    OpenFile(PathBuf),
    Status(SessionStatus),
}

#[derive(Default)]
pub struct RecordingUi {
    calls: Mutex<Vec<UiCall>>,
    raw: Arc<Mutex<Vec<u8>>>,
}

/// Collects everything written to the escape-sequence sink.
struct RawSink(Arc<Mutex<Vec<u8>>>);

impl Write for RawSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl RecordingUi {
    fn record(&self, call: UiCall) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<UiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn new_messages(&self) -> Vec<Message> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                UiCall::NewMessage(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn screens(&self) -> Vec<Vec<Message>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                UiCall::NewScreen(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                UiCall::Text(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                UiCall::Error(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    pub fn last_status(&self) -> Option<SessionStatus> {
        self.calls().into_iter().rev().find_map(|c| match c {
            UiCall::Status(s) => Some(s),
            _ => None,
        })
    }

    pub fn last_chats(&self) -> Option<Vec<Chat>> {
        self.calls().into_iter().rev().find_map(|c| match c {
            UiCall::SetChats(c) => Some(c),
            _ => None,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.last_status().map(|s| s.state).unwrap_or_default()
    }

    pub fn bells(&self) -> usize {
        self.raw.lock().unwrap().iter().filter(|b| **b == 0x07).count()
    }

    pub fn raw_output(&self) -> String {
        String::from_utf8_lossy(&self.raw.lock().unwrap()).into_owned()
    }
}

impl UiHandler for RecordingUi {
    fn new_message(&self, message: &Message) {
        self.record(UiCall::NewMessage(message.clone()));
    }

    fn new_screen(&self, messages: &[Message]) {
        self.record(UiCall::NewScreen(messages.to_vec()));
    }

    fn set_chats(&self, chats: &[Chat]) {
        self.record(UiCall::SetChats(chats.to_vec()));
    }

    fn print_error(&self, error: &str) {
        self.record(UiCall::Error(error.to_string()));
    }

    fn print_text(&self, text: &str) {
        self.record(UiCall::Text(text.to_string()));
    }

    fn print_file(&self, path: &Path) {
        self.record(UiCall::PrintFile(path.to_path_buf()));
    }

    fn open_file(&self, path: &Path) {
        self.record(UiCall::OpenFile(path.to_path_buf()));
    }

    fn set_status(&self, status: &SessionStatus) {
        self.record(UiCall::Status(status.clone()));
    }

    fn writer(&self) -> Box<dyn Write + Send> {
        Box::new(RawSink(Arc::clone(&self.raw)))
    }
}

// ---------------------------------------------------------------------------
// Scripted backend
// ---------------------------------------------------------------------------

/// Backend double that records every call.  `start` reports `Connected`,
/// fails when `fail_start` is set, or stays silent (as if waiting for
/// pairing) when `silent_start` is set.
#[derive(Default)]
pub struct ScriptedBackend {
    pub fail_start: bool,
    pub silent_start: bool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn failing() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    pub fn silent() -> Self {
        Self {
            silent_start: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn start(&self, events: mpsc::Sender<BackendEvent>) -> Result<(), BackendError> {
        self.record("start");
        if self.fail_start {
            return Err(BackendError::Other("network unreachable".into()));
        }
        if self.silent_start {
            return Ok(());
        }
        let _ = events.send(BackendEvent::Connected).await;
        Ok(())
    }

    async fn stop(&self) -> Result<(), BackendError> {
        self.record("stop");
        Ok(())
    }

    async fn send_command(&self, name: &str, params: &[String]) -> Result<(), BackendError> {
        self.record(format!("{name} {}", params.join(" ")));
        Ok(())
    }

    async fn download_attachment(&self, message: &Message, _dest: &Path) -> Result<(), BackendError> {
        self.record(format!("download {}", message.id));
        Err(BackendError::MediaUnavailable(message.id.clone()))
    }

    async fn wipe_session(&self) -> Result<(), BackendError> {
        self.record("wipe");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub fn test_config(dir: &Path) -> ClientConfig {
    ClientConfig {
        data_dir: dir.to_path_buf(),
        download_path: dir.join("downloads"),
        preview_path: dir.join("preview"),
        ..ClientConfig::default()
    }
}

pub struct Harness {
    pub ui: Arc<RecordingUi>,
    pub store: Arc<MessageStore>,
    pub commands: mpsc::Sender<Command>,
    pub events: mpsc::Sender<BackendEvent>,
    pub handle: JoinHandle<()>,
}

impl Harness {
    pub fn start(config: &ClientConfig, backend: Arc<dyn Backend>) -> Self {
        let ui = Arc::new(RecordingUi::default());
        let store = Arc::new(MessageStore::in_memory().unwrap());
        let (commands, commands_rx) = mpsc::channel(16);

        let session = SessionManager::new(
            config,
            Arc::clone(&store),
            backend,
            Arc::clone(&ui) as Arc<dyn UiHandler>,
            commands_rx,
        )
        .with_notifier(Notifier::new(NotifyMode::Bell));
        let events = session.event_sender();
        let handle = tokio::spawn(session.run());

        Self {
            ui,
            store,
            commands,
            events,
            handle,
        }
    }

    pub async fn command(&self, name: &str, params: &[&str]) {
        self.commands
            .send(Command::new(name, params.iter().copied()))
            .await
            .unwrap();
    }

    pub async fn event(&self, event: BackendEvent) {
        self.events.send(event).await.unwrap();
    }

    /// Close the command channel and wait for the loop to end.
    pub async fn finish(self) {
        drop(self.commands);
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("session did not stop")
            .unwrap();
    }
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

/// Let the loop drain whatever is queued.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

pub fn now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap()
}

pub fn inbound(id: &str, chat: &str, timestamp: u64) -> Message {
    let mut msg = Message::text(id, chat, "bob@s.whatsapp.net", timestamp, format!("text {id}"));
    msg.contact_short = "Bob".into();
    msg
}
