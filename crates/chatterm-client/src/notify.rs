//! Desktop / terminal notifications for live inbound messages.

use std::io::Write;

use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::ui::UiHandler;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyMode {
    Off,
    /// Write BEL to the UI sink.
    Bell,
    /// Spawn an external notifier with `title` and `body` appended.
    Command(String),
}

#[derive(Debug, Clone)]
pub struct Notifier {
    mode: NotifyMode,
}

impl Notifier {
    pub fn new(mode: NotifyMode) -> Self {
        Self { mode }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let mode = if !config.notifications {
            NotifyMode::Off
        } else if config.terminal_bell {
            NotifyMode::Bell
        } else {
            NotifyMode::Command(config.notify_command.clone())
        };
        Self::new(mode)
    }

    pub fn mode(&self) -> &NotifyMode {
        &self.mode
    }

    /// Fire a notification.  Never blocks the caller and never fails; problems
    /// are logged.
    pub fn notify(&self, ui: &dyn UiHandler, title: &str, body: &str) {
        match &self.mode {
            NotifyMode::Off => {}
            NotifyMode::Bell => {
                let mut sink = ui.writer();
                if let Err(e) = sink.write_all(b"\x07").and_then(|_| sink.flush()) {
                    warn!(error = %e, "terminal bell failed");
                }
            }
            NotifyMode::Command(command) => spawn_notifier(command, title, body),
        }
    }
}

fn spawn_notifier(command: &str, title: &str, body: &str) {
    let mut parts = command.split_whitespace();
    let Some(program) = parts.next() else {
        return;
    };

    let child = tokio::process::Command::new(program)
        .args(parts)
        .arg(title)
        .arg(body)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .kill_on_drop(false)
        .spawn();

    match child {
        Ok(mut child) => {
            debug!(program, "notification spawned");
            tokio::spawn(async move {
                let _ = child.wait().await;
            });
        }
        Err(e) => warn!(program, error = %e, "could not run notify command"),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use chatterm_shared::{Chat, Message, SessionStatus};

    use super::*;

    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct BellUi {
        sink: Sink,
    }

    impl UiHandler for BellUi {
        fn new_message(&self, _: &Message) {}
        fn new_screen(&self, _: &[Message]) {}
        fn set_chats(&self, _: &[Chat]) {}
        fn print_error(&self, _: &str) {}
        fn print_text(&self, _: &str) {}
        fn print_file(&self, _: &Path) {}
        fn open_file(&self, _: &Path) {}
        fn set_status(&self, _: &SessionStatus) {}
        fn writer(&self) -> Box<dyn Write + Send> {
            Box::new(self.sink.clone())
        }
    }

    #[test]
    fn mode_follows_config() {
        let mut config = ClientConfig::default();
        assert_eq!(Notifier::from_config(&config).mode(), &NotifyMode::Off);

        config.notifications = true;
        assert_eq!(
            Notifier::from_config(&config).mode(),
            &NotifyMode::Command("notify-send".into())
        );

        config.terminal_bell = true;
        assert_eq!(Notifier::from_config(&config).mode(), &NotifyMode::Bell);
    }

    #[test]
    fn bell_writes_bel() {
        let ui = BellUi::default();
        Notifier::new(NotifyMode::Bell).notify(&ui, "Bob", "hi");
        assert_eq!(*ui.sink.0.lock().unwrap(), b"\x07");

        Notifier::new(NotifyMode::Off).notify(&ui, "Bob", "hi");
        assert_eq!(ui.sink.0.lock().unwrap().len(), 1);
    }
}
