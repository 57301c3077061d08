//! Client configuration loaded from environment variables.
//!
//! All settings have working defaults so `chatterm` starts with zero
//! configuration.  Invalid values are logged and the default is kept.

use std::path::PathBuf;
use std::time::Duration;

use chatterm_shared::constants::{
    APP_NAME, DEFAULT_BACKLOG_QUANTITY, DEFAULT_CMD_PREFIX, DEFAULT_PAIRING_TIMEOUT_SECS,
};
use chatterm_store::database::DB_FILE_NAME;
use chatterm_store::MessageStore;
use directories::{ProjectDirs, UserDirs};

use crate::error::Result;

/// File name of the backend credential blob inside the data directory.
pub const SESSION_FILE_NAME: &str = "session.json";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Directory holding the message database and session credentials.
    /// Env: `CHATTERM_DATA_DIR`
    pub data_dir: PathBuf,

    /// Where `download` stores attachments.
    /// Env: `CHATTERM_DOWNLOAD_PATH`
    /// Default: the user's download directory.
    pub download_path: PathBuf,

    /// Where `open` and `show` stage attachments.
    /// Env: `CHATTERM_PREVIEW_PATH`
    pub preview_path: PathBuf,

    /// Prefix that marks an input line as a command.
    /// Env: `CHATTERM_CMD_PREFIX`
    /// Default: `/`
    pub cmd_prefix: String,

    /// Env: `CHATTERM_NOTIFICATIONS` (true/false)
    /// Default: `false`
    pub notifications: bool,

    /// Ring the terminal bell instead of running the notify command.
    /// Env: `CHATTERM_TERMINAL_BELL` (true/false)
    /// Default: `false`
    pub terminal_bell: bool,

    /// External notifier, invoked with title and body as arguments.
    /// Env: `CHATTERM_NOTIFY_COMMAND`
    /// Default: `notify-send`
    pub notify_command: String,

    /// Renders an attachment for `show`; the file path is appended.
    /// Env: `CHATTERM_SHOW_COMMAND`
    /// Default: `jp2a --color`
    pub show_command: String,

    /// Opens an attachment for `open`; the file path is appended.
    /// Env: `CHATTERM_OPEN_COMMAND`
    /// Default: `xdg-open`
    pub open_command: String,

    /// Number of messages requested by `backlog`.
    /// Env: `CHATTERM_BACKLOG`
    /// Default: `10`
    pub backlog_quantity: usize,

    /// Upper bound on waiting for the user to confirm a pairing code.
    /// Env: `CHATTERM_PAIRING_TIMEOUT_SECS`
    /// Default: `120`
    pub pairing_timeout: Duration,

    /// Log destination.  Stdout belongs to the UI, so logs go here or to stderr.
    /// Env: `CHATTERM_LOG_FILE`
    pub log_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let data_dir = ProjectDirs::from("org", APP_NAME, APP_NAME)
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(format!(".{APP_NAME}")));
        let download_path = UserDirs::new()
            .and_then(|dirs| dirs.download_dir().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| data_dir.join("downloads"));

        Self {
            preview_path: std::env::temp_dir().join(APP_NAME),
            download_path,
            data_dir,
            cmd_prefix: DEFAULT_CMD_PREFIX.to_string(),
            notifications: false,
            terminal_bell: false,
            notify_command: "notify-send".to_string(),
            show_command: "jp2a --color".to_string(),
            open_command: "xdg-open".to_string(),
            backlog_quantity: DEFAULT_BACKLOG_QUANTITY,
            pairing_timeout: Duration::from_secs(DEFAULT_PAIRING_TIMEOUT_SECS),
            log_file: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("CHATTERM_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(path) = lookup("CHATTERM_DOWNLOAD_PATH") {
            config.download_path = PathBuf::from(path);
        }

        if let Some(path) = lookup("CHATTERM_PREVIEW_PATH") {
            config.preview_path = PathBuf::from(path);
        }

        if let Some(prefix) = lookup("CHATTERM_CMD_PREFIX") {
            if prefix.trim().is_empty() {
                tracing::warn!("Empty CHATTERM_CMD_PREFIX, using default");
            } else {
                config.cmd_prefix = prefix.trim().to_string();
            }
        }

        if let Some(val) = lookup("CHATTERM_NOTIFICATIONS") {
            config.notifications = parse_flag(&val);
        }

        if let Some(val) = lookup("CHATTERM_TERMINAL_BELL") {
            config.terminal_bell = parse_flag(&val);
        }

        if let Some(cmd) = lookup("CHATTERM_NOTIFY_COMMAND") {
            config.notify_command = cmd;
        }

        if let Some(cmd) = lookup("CHATTERM_SHOW_COMMAND") {
            config.show_command = cmd;
        }

        if let Some(cmd) = lookup("CHATTERM_OPEN_COMMAND") {
            config.open_command = cmd;
        }

        if let Some(val) = lookup("CHATTERM_BACKLOG") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.backlog_quantity = n,
                _ => tracing::warn!(value = %val, "Invalid CHATTERM_BACKLOG, using default"),
            }
        }

        if let Some(val) = lookup("CHATTERM_PAIRING_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.pairing_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(
                    value = %val,
                    "Invalid CHATTERM_PAIRING_TIMEOUT_SECS, using default"
                ),
            }
        }

        if let Some(path) = lookup("CHATTERM_LOG_FILE") {
            if !path.is_empty() {
                config.log_file = Some(PathBuf::from(path));
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE_NAME)
    }

    /// Create the data directory and open the message store inside it.
    pub fn open_store(&self) -> Result<MessageStore> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(MessageStore::open_at(&self.database_path())?)
    }
}

fn parse_flag(val: &str) -> bool {
    !matches!(val.trim().to_ascii_lowercase().as_str(), "" | "0" | "false" | "no" | "off")
}
