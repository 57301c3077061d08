/// Application name
pub const APP_NAME: &str = "chatterm";

/// Suffix carried by one-to-one contact identifiers
pub const CONTACT_SUFFIX: &str = "@s.whatsapp.net";

/// Legacy suffix some backends still emit for contacts
pub const LEGACY_CONTACT_SUFFIX: &str = "@c.us";

/// Suffix carried by group chat identifiers
pub const GROUP_SUFFIX: &str = "@g.us";

/// Suffixes stripped when falling back to a raw identifier for display
pub const KNOWN_ID_SUFFIXES: [&str; 3] = [CONTACT_SUFFIX, LEGACY_CONTACT_SUFFIX, GROUP_SUFFIX];

/// Inbound messages younger than this (seconds) count as live
pub const RECENCY_WINDOW_SECS: u64 = 30;

/// Maximum number of opaque payloads carried by a media reference
pub const MAX_MEDIA_PAYLOADS: usize = 3;

/// Default prefix marking an input line as a command
pub const DEFAULT_CMD_PREFIX: &str = "/";

/// Capacity of the UI -> session command channel
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the backend -> session event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default number of history messages requested by `backlog`
pub const DEFAULT_BACKLOG_QUANTITY: usize = 10;

/// Default bound on a pairing attempt (seconds)
pub const DEFAULT_PAIRING_TIMEOUT_SECS: u64 = 120;

/// Returned by `describe` for unknown message identifiers
pub const MESSAGE_NOT_FOUND: &str = "message not found";
