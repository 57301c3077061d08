//! Line-mode terminal front end.
//!
//! [`TerminalUi`] turns render calls into [`UiUpdate`]s for a render task
//! that owns stdout, so the session loop never waits on the terminal.  Input
//! is read on a dedicated thread (a blocking stdin read would otherwise keep
//! the runtime from shutting down) and translated into [`Command`]s.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, TimeZone};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use chatterm_shared::{Chat, Command, Message, SessionStatus};

use crate::config::ClientConfig;
use crate::ui::UiHandler;

#[derive(Debug)]
pub enum UiUpdate {
    Message(Message),
    Screen(Vec<Message>),
    Chats(Vec<Chat>),
    Error(String),
    Text(String),
    PrintFile(PathBuf),
    OpenFile(PathBuf),
    Status(SessionStatus),
    /// Bytes for the terminal as-is (bell, QR code).
    Raw(Vec<u8>),
}

pub struct TerminalUi {
    tx: mpsc::UnboundedSender<UiUpdate>,
}

impl TerminalUi {
    /// Start the render task.  It ends once every `TerminalUi` clone is gone.
    pub fn spawn(config: &ClientConfig) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(render_loop(
            rx,
            config.show_command.clone(),
            config.open_command.clone(),
        ));
        (Self { tx }, handle)
    }

    fn push(&self, update: UiUpdate) {
        if self.tx.send(update).is_err() {
            debug!("render task gone, dropping update");
        }
    }
}

impl UiHandler for TerminalUi {
    fn new_message(&self, message: &Message) {
        self.push(UiUpdate::Message(message.clone()));
    }

    fn new_screen(&self, messages: &[Message]) {
        self.push(UiUpdate::Screen(messages.to_vec()));
    }

    fn set_chats(&self, chats: &[Chat]) {
        self.push(UiUpdate::Chats(chats.to_vec()));
    }

    fn print_error(&self, error: &str) {
        self.push(UiUpdate::Error(error.to_string()));
    }

    fn print_text(&self, text: &str) {
        self.push(UiUpdate::Text(text.to_string()));
    }

    fn print_file(&self, path: &Path) {
        self.push(UiUpdate::PrintFile(path.to_path_buf()));
    }

    fn open_file(&self, path: &Path) {
        self.push(UiUpdate::OpenFile(path.to_path_buf()));
    }

    fn set_status(&self, status: &SessionStatus) {
        self.push(UiUpdate::Status(status.clone()));
    }

    fn writer(&self) -> Box<dyn Write + Send> {
        Box::new(RawWriter {
            tx: self.tx.clone(),
        })
    }
}

/// Queues raw output behind whatever the render task is still printing.
struct RawWriter {
    tx: mpsc::UnboundedSender<UiUpdate>,
}

impl Write for RawWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.tx
            .send(UiUpdate::Raw(buf.to_vec()))
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::BrokenPipe, "render task gone"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

async fn render_loop(
    mut rx: mpsc::UnboundedReceiver<UiUpdate>,
    show_command: String,
    open_command: String,
) {
    let mut last_status: Option<String> = None;

    while let Some(update) = rx.recv().await {
        let out = match update {
            UiUpdate::Raw(bytes) => {
                let mut stdout = std::io::stdout().lock();
                if stdout.write_all(&bytes).and_then(|_| stdout.flush()).is_err() {
                    break;
                }
                continue;
            }
            UiUpdate::Message(message) => format_message(&message),
            UiUpdate::Screen(messages) => {
                let mut out = String::from("----");
                for message in &messages {
                    out.push('\n');
                    out.push_str(&format_message(message));
                }
                out
            }
            UiUpdate::Chats(chats) => format_chats(&chats),
            UiUpdate::Error(error) => format!("error: {error}"),
            UiUpdate::Text(text) => text,
            UiUpdate::Status(status) => {
                let line = format_status(&status);
                // The session pushes status often; only print changes.
                if last_status.as_deref() == Some(line.as_str()) {
                    continue;
                }
                last_status = Some(line.clone());
                line
            }
            UiUpdate::PrintFile(path) => show_file(&show_command, &path).await,
            UiUpdate::OpenFile(path) => {
                open_file(&open_command, &path);
                continue;
            }
        };

        let mut stdout = std::io::stdout().lock();
        if writeln!(stdout, "{out}").and_then(|_| stdout.flush()).is_err() {
            break;
        }
    }

    debug!("render loop terminated");
}

pub fn format_message(message: &Message) -> String {
    let time = i64::try_from(message.timestamp)
        .ok()
        .and_then(|ts| Local.timestamp_opt(ts, 0).single())
        .map(|dt| dt.format("%d.%m. %H:%M").to_string())
        .unwrap_or_else(|| "--.--. --:--".to_string());

    let sender = if message.from_me {
        "me"
    } else if !message.contact_short.is_empty() {
        message.contact_short.as_str()
    } else {
        message.contact_name.as_str()
    };

    let mut line = format!("[{time}] {sender}: ");
    if message.forwarded {
        line.push_str("[fwd] ");
    }
    line.push_str(&message.text);
    if let Some(media) = message.media.as_ref().filter(|_| message.has_media()) {
        line.push_str(&format!(" [{}]", media.kind));
    }
    line.push_str(&format!("  #{}", message.id));
    line
}

pub fn format_chats(chats: &[Chat]) -> String {
    let mut out = String::from("chats:");
    for chat in chats {
        let marker = if chat.is_group { '#' } else { '@' };
        out.push_str(&format!("\n  {marker} {}", chat.name));
        if chat.unread > 0 {
            out.push_str(&format!(" ({})", chat.unread));
        }
        out.push_str(&format!("  [{}]", chat.id));
    }
    out
}

pub fn format_status(status: &SessionStatus) -> String {
    let mut line = format!("[{}]", status.state);
    if status.connected {
        line.push_str(&format!(" battery {}%", status.battery_charge));
        if status.battery_loading {
            line.push_str(" charging");
        }
        if status.battery_powersave {
            line.push_str(" powersave");
        }
    }
    if !status.last_seen.is_empty() {
        line.push_str(&format!(" last seen {}", status.last_seen));
    }
    line
}

async fn show_file(show_command: &str, path: &Path) -> String {
    let mut parts = show_command.split_whitespace();
    let Some(program) = parts.next() else {
        return format!("file: {}", path.display());
    };

    match tokio::process::Command::new(program)
        .args(parts)
        .arg(path)
        .output()
        .await
    {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim_end().to_string()
        }
        Ok(output) => format!(
            "error: {program} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim_end()
        ),
        Err(e) => {
            warn!(program, error = %e, "show command failed");
            format!("file: {}", path.display())
        }
    }
}

fn open_file(open_command: &str, path: &Path) {
    let mut parts = open_command.split_whitespace();
    let Some(program) = parts.next() else {
        return;
    };
    match tokio::process::Command::new(program)
        .args(parts)
        .arg(path)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
    {
        Ok(mut child) => {
            tokio::spawn(async move {
                let _ = child.wait().await;
            });
        }
        Err(e) => warn!(program, error = %e, "open command failed"),
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    /// Blank line.
    Nothing,
    /// Plain text typed with no chat selected.
    NoChatSelected,
}

/// Turns typed lines into commands.  Plain text goes to the chat most
/// recently opened with `select`.
#[derive(Debug)]
pub struct InputTranslator {
    prefix: String,
    selected: Option<String>,
}

impl InputTranslator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            selected: None,
        }
    }

    pub fn translate(&mut self, line: &str) -> Input {
        let line = line.trim();
        if line.is_empty() {
            return Input::Nothing;
        }

        if line.starts_with(&self.prefix) {
            let Some(cmd) = Command::parse(line, &self.prefix) else {
                return Input::Nothing;
            };
            match (cmd.name.as_str(), cmd.params.as_slice()) {
                ("select", [chat]) => self.selected = Some(chat.clone()),
                ("reset", _) => self.selected = None,
                _ => {}
            }
            return Input::Command(cmd);
        }

        match &self.selected {
            Some(chat) => Input::Command(Command::new("send", [chat.clone(), line.to_string()])),
            None => Input::NoChatSelected,
        }
    }
}

/// Read stdin on its own thread until EOF or `quit`.  Dropping the command
/// sender at the end lets the session loop finish.
pub fn spawn_input_thread(
    prefix: String,
    commands: mpsc::Sender<Command>,
    ui: Arc<dyn UiHandler>,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("chatterm-input".into())
        .spawn(move || {
            let mut translator = InputTranslator::new(prefix);
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                match translator.translate(&line) {
                    Input::Command(cmd) => {
                        let quit = matches!(cmd.name.as_str(), "quit" | "exit");
                        if commands.blocking_send(cmd).is_err() || quit {
                            break;
                        }
                    }
                    Input::NoChatSelected => ui.print_error("no chat selected, use /select <chat>"),
                    Input::Nothing => {}
                }
            }
            debug!("input thread finished");
        })
}
