use thiserror::Error;

/// Errors surfaced by a [`crate::Backend`] implementation.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Not connected")]
    NotConnected,

    #[error("Unknown backend command: {0}")]
    UnknownCommand(String),

    /// Wrong parameter count or shape for a known command.
    #[error("Usage: {0}")]
    Usage(String),

    #[error("Media unavailable for message {0}")]
    MediaUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend task is gone.
    #[error("Backend channel closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, BackendError>;
