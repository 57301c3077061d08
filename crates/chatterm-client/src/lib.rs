//! # chatterm-client
//!
//! Session core of the chatterm terminal client: the single-writer control
//! loop, its command and event handlers, configuration, notifications and a
//! line-mode terminal front end.

pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod notify;
pub mod session;
pub mod state;
pub mod terminal;
pub mod ui;

pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use notify::{Notifier, NotifyMode};
pub use session::SessionManager;
pub use terminal::TerminalUi;
pub use ui::UiHandler;
