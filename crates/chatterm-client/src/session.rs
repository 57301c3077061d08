//! The session control loop.
//!
//! [`SessionManager`] is the only writer of session state.  It consumes two
//! bounded channels, UI [`Command`]s and [`BackendEvent`]s, and handles one
//! item at a time.  Anything slow (connecting, sending, downloads, timers)
//! runs in a spawned task whose outcome comes back as an event, so a stuck
//! network call can never stall rendering or input.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use chatterm_backend::{Backend, BackendError, BackendEvent};
use chatterm_shared::constants::EVENT_CHANNEL_CAPACITY;
use chatterm_shared::{Command, ConnectionState};
use chatterm_store::MessageStore;

use crate::config::ClientConfig;
use crate::notify::Notifier;
use crate::state::SessionState;
use crate::ui::UiHandler;

/// Whether the loop keeps running after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Quit,
}

/// Settings the loop needs from [`ClientConfig`].
#[derive(Debug, Clone)]
pub(crate) struct SessionSettings {
    pub download_path: PathBuf,
    pub preview_path: PathBuf,
    pub backlog_quantity: usize,
    pub pairing_timeout: Duration,
}

pub struct SessionManager {
    pub(crate) store: Arc<MessageStore>,
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) ui: Arc<dyn UiHandler>,
    pub(crate) notifier: Notifier,
    pub(crate) settings: SessionSettings,
    pub(crate) state: SessionState,
    events_tx: mpsc::Sender<BackendEvent>,
    events_rx: mpsc::Receiver<BackendEvent>,
    commands_rx: mpsc::Receiver<Command>,
}

impl SessionManager {
    pub fn new(
        config: &ClientConfig,
        store: Arc<MessageStore>,
        backend: Arc<dyn Backend>,
        ui: Arc<dyn UiHandler>,
        commands_rx: mpsc::Receiver<Command>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            backend,
            ui,
            notifier: Notifier::from_config(config),
            settings: SessionSettings {
                download_path: config.download_path.clone(),
                preview_path: config.preview_path.clone(),
                backlog_quantity: config.backlog_quantity,
                pairing_timeout: config.pairing_timeout,
            },
            state: SessionState::new(),
            events_tx,
            events_rx,
            commands_rx,
        }
    }

    /// Replace the notifier chosen from the configuration.
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    /// Sender for the event channel, for backends started outside the
    /// session or for injecting events in tests.
    pub fn event_sender(&self) -> mpsc::Sender<BackendEvent> {
        self.events_tx.clone()
    }

    /// Run until `quit` or until the command channel closes.
    ///
    /// The session keeps a sender for its own tasks, so the event channel
    /// cannot close underneath it; once no more commands can arrive, pending
    /// events are drained and the loop ends.
    pub async fn run(mut self) {
        info!("session loop started");
        self.push_status();

        loop {
            tokio::select! {
                cmd = self.commands_rx.recv() => match cmd {
                    Some(cmd) => {
                        if self.handle_command(cmd) == Flow::Quit {
                            info!("quit requested");
                            break;
                        }
                    }
                    None => {
                        info!("command channel closed");
                        while let Ok(event) = self.events_rx.try_recv() {
                            self.handle_event(event);
                        }
                        break;
                    }
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event),
            }
        }

        self.shutdown().await;
    }

    async fn shutdown(self) {
        let Self {
            backend,
            state,
            events_rx,
            ..
        } = self;

        // Nobody reads events any more; let backend sends fail fast.
        drop(events_rx);

        if state.connection != ConnectionState::Disconnected {
            if let Err(e) = backend.stop().await {
                warn!(error = %e, "backend stop failed during shutdown");
            }
        }
        info!("session loop terminated");
    }

    // ------------------------------------------------------------------
    // Helpers shared by command and event handlers
    // ------------------------------------------------------------------

    /// Run backend work off-loop.  A failure is reported back as
    /// `CommandFailed` for `command`.
    pub(crate) fn spawn_backend<F, Fut>(&self, command: &str, work: F)
    where
        F: FnOnce(Arc<dyn Backend>, mpsc::Sender<BackendEvent>) -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<(), BackendError>> + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        let events = self.events_tx.clone();
        let command = command.to_string();
        tokio::spawn(async move {
            if let Err(e) = work(backend, events.clone()).await {
                debug!(command = %command, error = %e, "backend task failed");
                let _ = events
                    .send(BackendEvent::CommandFailed {
                        command,
                        error: e.to_string(),
                    })
                    .await;
            }
        });
    }

    /// Post `event` after `delay`.
    pub(crate) fn schedule(&self, delay: Duration, event: BackendEvent) {
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(event).await;
        });
    }

    pub(crate) fn set_connection(&mut self, connection: ConnectionState) {
        if self.state.connection != connection {
            debug!(from = %self.state.connection, to = %connection, "connection state");
        }
        self.state.set_connection(connection);
        self.push_status();
    }

    /// Update connectivity, printing a transition line only on change.
    pub(crate) fn set_connected(&mut self, connected: bool) {
        if self.state.set_connected(connected) {
            self.ui
                .print_text(if connected { "connected" } else { "disconnected" });
        }
        self.push_status();
    }

    pub(crate) fn push_status(&self) {
        self.ui.set_status(&self.state.status);
    }

    pub(crate) fn push_chats(&self) {
        match self.store.list_chats() {
            Ok(chats) => self.ui.set_chats(&chats),
            Err(e) => {
                error!(error = %e, "could not list chats");
                self.ui.print_error(&format!("could not load chats: {e}"));
            }
        }
    }

    /// Re-render the whole transcript of the selected chat.
    pub(crate) fn refresh_screen(&self) {
        let Some(chat_id) = self.state.selected_chat.as_deref() else {
            return;
        };
        match self.store.list_messages(chat_id) {
            Ok(messages) => self.ui.new_screen(&messages),
            Err(e) => {
                error!(chat = %chat_id, error = %e, "could not load messages");
                self.ui.print_error(&format!("could not load messages: {e}"));
            }
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.state.connection == ConnectionState::Connected
    }
}
