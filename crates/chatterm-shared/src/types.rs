use serde::{Deserialize, Serialize};

use crate::constants::{GROUP_SUFFIX, KNOWN_ID_SUFFIXES, MAX_MEDIA_PAYLOADS};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Strip every known backend suffix from a raw identifier.
///
/// Used as the last fallback whenever no contact record carries a name.
pub fn strip_known_suffixes(id: &str) -> &str {
    let mut out = id;
    for suffix in KNOWN_ID_SUFFIXES {
        out = out.strip_suffix(suffix).unwrap_or(out);
    }
    out
}

/// Whether a chat identifier lives in the group namespace.
pub fn is_group_id(id: &str) -> bool {
    id.ends_with(GROUP_SUFFIX)
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Backend-neutral description of an attachment.
///
/// Every backend normalizes its concrete media variants (image, audio,
/// document, ...) into this shape so the store and session never need to
/// know wire types.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaRef {
    /// Direct path or URL used to fetch the encrypted bytes.
    pub link: String,
    /// MIME-type-ish classifier, e.g. `image/jpeg`.
    pub kind: String,
    /// Opaque key / hash material, at most [`MAX_MEDIA_PAYLOADS`] entries.
    pub payloads: Vec<Vec<u8>>,
}

impl MediaRef {
    pub fn new(link: impl Into<String>, kind: impl Into<String>, mut payloads: Vec<Vec<u8>>) -> Self {
        payloads.truncate(MAX_MEDIA_PAYLOADS);
        Self {
            link: link.into(),
            kind: kind.into(),
            payloads,
        }
    }

    /// Payload at `index`, or an empty slice when absent.
    pub fn payload(&self, index: usize) -> &[u8] {
        self.payloads.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// File extension guessed from the media kind.
    pub fn extension(&self) -> &str {
        let kind = self.kind.split(';').next().unwrap_or("").trim();
        match kind {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "audio/ogg" => "ogg",
            "audio/mpeg" => "mp3",
            "audio/mp4" | "audio/aac" => "m4a",
            "video/mp4" => "mp4",
            "application/pdf" => "pdf",
            "text/plain" => "txt",
            _ => kind
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric()))
                .unwrap_or("bin"),
        }
    }
}

/// A single chat message as stored and rendered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Backend-assigned identifier, unique per store.
    pub id: String,
    /// Conversation (contact or group) the message belongs to.
    pub chat_id: String,
    /// Sender identifier.
    pub contact_id: String,
    /// Sender display name, denormalized for rendering.
    pub contact_name: String,
    /// Sender short (pushname-style) name.
    pub contact_short: String,
    /// Seconds since the Unix epoch, backend-assigned.
    pub timestamp: u64,
    pub from_me: bool,
    pub forwarded: bool,
    pub text: String,
    pub media: Option<MediaRef>,
}

impl Message {
    /// Minimal text message; remaining fields default.
    pub fn text(
        id: impl Into<String>,
        chat_id: impl Into<String>,
        contact_id: impl Into<String>,
        timestamp: u64,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            chat_id: chat_id.into(),
            contact_id: contact_id.into(),
            timestamp,
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn has_media(&self) -> bool {
        self.media.as_ref().is_some_and(|m| !m.link.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Chat / Contact
// ---------------------------------------------------------------------------

/// A conversation: one-to-one or group.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chat {
    pub id: String,
    pub is_group: bool,
    pub name: String,
    pub unread: u32,
    /// Timestamp of the newest message, seconds since epoch.
    pub last_message: u64,
}

impl Chat {
    pub fn new(id: impl Into<String>, name: impl Into<String>, last_message: u64) -> Self {
        let id = id.into();
        Self {
            is_group: is_group_id(&id),
            id,
            name: name.into(),
            unread: 0,
            last_message,
        }
    }
}

/// A named person behind a sender identifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    pub id: String,
    /// Full name, if known.
    pub name: String,
    /// Short / pushname, if known.
    pub short: String,
}

impl Contact {
    pub fn new(id: impl Into<String>, name: impl Into<String>, short: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            short: short.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Connection lifecycle as seen by the session manager.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    AwaitingPairing,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingPairing => "awaiting pairing",
            Self::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// Projection pushed to the status bar; recomputed, never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: ConnectionState,
    pub connected: bool,
    pub battery_charge: u8,
    pub battery_loading: bool,
    pub battery_powersave: bool,
    pub last_seen: String,
}

/// A UI request consumed exactly once by the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub params: Vec<String>,
}

impl Command {
    pub fn new<I, S>(name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse an input line that starts with `prefix`.
    ///
    /// Returns `None` for lines without the prefix or with nothing after it.
    pub fn parse(line: &str, prefix: &str) -> Option<Self> {
        let rest = line.trim().strip_prefix(prefix)?;
        let mut words = rest.split_whitespace();
        let name = words.next()?.to_lowercase();
        Some(Self {
            name,
            params: words.map(str::to_string).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_known_suffixes() {
        assert_eq!(strip_known_suffixes("4915112345@s.whatsapp.net"), "4915112345");
        assert_eq!(strip_known_suffixes("12345-678@g.us"), "12345-678");
        assert_eq!(strip_known_suffixes("plain"), "plain");
    }

    #[test]
    fn test_group_detection() {
        assert!(Chat::new("team@g.us", "Team", 0).is_group);
        assert!(!Chat::new("bob@s.whatsapp.net", "Bob", 0).is_group);
    }

    #[test]
    fn test_media_ref_clamps_payloads() {
        let media = MediaRef::new("/d/1", "image/jpeg", vec![vec![1], vec![2], vec![3], vec![4]]);
        assert_eq!(media.payloads.len(), 3);
        assert_eq!(media.payload(2), &[3]);
        assert!(media.payload(5).is_empty());
        assert_eq!(media.extension(), "jpg");
    }

    #[test]
    fn test_media_extension_fallback() {
        assert_eq!(MediaRef::new("x", "audio/ogg; codecs=opus", vec![]).extension(), "ogg");
        assert_eq!(MediaRef::new("x", "application/zip", vec![]).extension(), "zip");
        assert_eq!(MediaRef::new("x", "", vec![]).extension(), "bin");
    }

    #[test]
    fn test_command_parse() {
        let cmd = Command::parse("/send bob@s.whatsapp.net hello there", "/").unwrap();
        assert_eq!(cmd.name, "send");
        assert_eq!(cmd.params, vec!["bob@s.whatsapp.net", "hello", "there"]);

        assert_eq!(Command::parse("/LOGIN", "/").unwrap().name, "login");
        assert!(Command::parse("hello", "/").is_none());
        assert!(Command::parse("/   ", "/").is_none());
    }
}
