//! Persisted session credentials.
//!
//! The blob is opaque to the rest of the application: it is written once
//! pairing succeeds and deleted on logout.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    /// Random client identifier, base64.
    pub client_id: String,
    /// Our own account id on the network.
    pub own_id: String,
    pub device_name: String,
    /// Seconds since epoch.
    pub paired_at: i64,
}

impl Credentials {
    pub fn generate(own_id: impl Into<String>, device_name: impl Into<String>) -> Self {
        Self {
            client_id: random_token(16),
            own_id: own_id.into(),
            device_name: device_name.into(),
            paired_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Load credentials from `path`.
    ///
    /// A missing file is `Ok(None)`.  A corrupt file is logged and treated as
    /// missing so the user can pair again.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&raw) {
            Ok(creds) => Ok(Some(creds)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt session file");
                Ok(None)
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        debug!(path = %path.display(), "session credentials saved");
        Ok(())
    }

    /// Remove the credential file.  Returns whether a file existed.
    pub fn wipe(path: &Path) -> Result<bool> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// `len` random bytes, base64 encoded.
pub fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    BASE64.encode(bytes)
}
