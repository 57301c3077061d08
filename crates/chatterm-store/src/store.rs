//! Thread-safe facade over [`Database`].
//!
//! [`MessageStore`] is the single source of truth for messages, chats and
//! contacts.  One mutex guards the connection; it is only ever held inside the
//! store's own methods, so callers can never keep it across a call into
//! another component.  Write volume is human-rate, so a single lock keeps the
//! derived aggregates (unread counts, last-message ordering) consistent
//! without further coordination.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chatterm_shared::constants::MESSAGE_NOT_FOUND;
use chatterm_shared::{strip_known_suffixes, Chat, Contact, Message};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::database::Database;
use crate::error::{Result, StoreError};

pub struct MessageStore {
    db: Mutex<Database>,
}

impl MessageStore {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Open a store backed by the database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self> {
        Database::open_at(path).map(Self::new)
    }

    /// Store without persistence, used by tests and throwaway sessions.
    pub fn in_memory() -> Result<Self> {
        Database::open_in_memory().map(Self::new)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>> {
        self.db.lock().map_err(|_| StoreError::LockPoisoned)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Insert a message.  Returns `true` iff its id was not stored before.
    ///
    /// A new message advances its chat's last-message timestamp (creating the
    /// chat if needed) and backfills a contact record for an unseen sender.
    /// Duplicates change nothing.
    pub fn insert(&self, message: &Message) -> Result<bool> {
        let db = self.lock()?;
        let tx = db.conn().unchecked_transaction()?;

        if !db.insert_message(message)? {
            debug!(id = %message.id, chat = %message.chat_id, "duplicate message ignored");
            return Ok(false);
        }

        db.touch_chat(&message.chat_id, message.timestamp)?;

        if !message.contact_id.is_empty()
            && !message.from_me
            && db.get_contact(&message.contact_id)?.is_none()
        {
            db.upsert_contact(&Contact::new(
                message.contact_id.clone(),
                message.contact_name.clone(),
                message.contact_short.clone(),
            ))?;
        }

        tx.commit()?;
        Ok(true)
    }

    pub fn upsert_chat(&self, chat: &Chat) -> Result<()> {
        self.lock()?.upsert_chat(chat)
    }

    pub fn upsert_contact(&self, contact: &Contact) -> Result<()> {
        self.lock()?.upsert_contact(contact)
    }

    /// Bump the unread counter by one; unknown chats are ignored.
    pub fn mark_unread(&self, chat_id: &str) -> Result<()> {
        if !self.lock()?.increment_unread(chat_id)? {
            debug!(chat = %chat_id, "mark_unread on unknown chat");
        }
        Ok(())
    }

    pub fn reset_unread(&self, chat_id: &str) -> Result<()> {
        self.lock()?.reset_unread(chat_id)?;
        Ok(())
    }

    pub fn rename_chat(&self, chat_id: &str, name: &str) -> Result<()> {
        self.lock()?.rename_chat(chat_id, name)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// All chats, most recent first.  Unnamed chats get a resolved name.
    pub fn list_chats(&self) -> Result<Vec<Chat>> {
        let db = self.lock()?;
        let mut chats = db.list_chats()?;
        for chat in chats.iter_mut().filter(|c| c.name.is_empty()) {
            chat.name = short_name(&db, &chat.id);
        }
        Ok(chats)
    }

    /// All messages of a chat, oldest first, with sender names resolved.
    pub fn list_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        let db = self.lock()?;
        let mut messages = db.get_messages_for_chat(chat_id)?;
        for msg in &mut messages {
            fill_sender_names(&db, msg);
        }
        Ok(messages)
    }

    pub fn get_message(&self, id: &str) -> Result<Option<Message>> {
        let db = self.lock()?;
        let mut msg = db.get_message_by_id(id)?;
        if let Some(msg) = msg.as_mut() {
            fill_sender_names(&db, msg);
        }
        Ok(msg)
    }

    pub fn get_chat(&self, id: &str) -> Result<Option<Chat>> {
        self.lock()?.get_chat(id)
    }

    pub fn message_count(&self, chat_id: &str) -> Result<usize> {
        self.lock()?.count_messages_for_chat(chat_id)
    }

    /// Diagnostic dump of one message for the `info` command.
    ///
    /// Unknown ids yield [`MESSAGE_NOT_FOUND`]; storage faults are rendered
    /// into the text rather than returned.
    pub fn describe(&self, message_id: &str) -> String {
        let db = match self.lock() {
            Ok(db) => db,
            Err(e) => return format!("{MESSAGE_NOT_FOUND}: {message_id} ({e})"),
        };
        let msg = match db.get_message_by_id(message_id) {
            Ok(Some(msg)) => msg,
            Ok(None) => return format!("{MESSAGE_NOT_FOUND}: {message_id}"),
            Err(e) => {
                warn!(id = %message_id, error = %e, "describe failed");
                return format!("{MESSAGE_NOT_FOUND}: {message_id} ({e})");
            }
        };

        let chat_name = match db.get_chat(&msg.chat_id) {
            Ok(Some(chat)) if !chat.name.is_empty() => chat.name,
            _ => short_name(&db, &msg.chat_id),
        };
        let time = i64::try_from(msg.timestamp)
            .ok()
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| msg.timestamp.to_string());

        let mut out = format!(
            "id:        {}\nchat:      {} ({})\nsender:    {} ({} / {})\ntime:      {}\nfrom me:   {}\nforwarded: {}",
            msg.id,
            msg.chat_id,
            chat_name,
            msg.contact_id,
            display_name(&db, &msg.contact_id),
            short_name(&db, &msg.contact_id),
            time,
            msg.from_me,
            msg.forwarded,
        );
        if let Some(media) = &msg.media {
            out.push_str(&format!("\nmedia:     {} {}", media.kind, media.link));
            for (i, payload) in media.payloads.iter().enumerate() {
                out.push_str(&format!("\n  data{}:   {}", i + 1, hex::encode(payload)));
            }
        }
        out
    }

    /// Display name: stored name, then short name, then the bare id.
    pub fn resolve_display_name(&self, id: &str) -> String {
        match self.lock() {
            Ok(db) => display_name(&db, id),
            Err(_) => strip_known_suffixes(id).to_string(),
        }
    }

    /// Short name: stored short name, then full name, then the bare id.
    pub fn resolve_short_name(&self, id: &str) -> String {
        match self.lock() {
            Ok(db) => short_name(&db, id),
            Err(_) => strip_known_suffixes(id).to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Name resolution (lock already held)
// ---------------------------------------------------------------------------

fn contact_names(db: &Database, id: &str) -> (String, String) {
    match db.get_contact(id) {
        Ok(Some(c)) => (c.name, c.short),
        Ok(None) => (String::new(), String::new()),
        Err(e) => {
            warn!(id = %id, error = %e, "contact lookup failed");
            (String::new(), String::new())
        }
    }
}

fn pick(first: String, second: String, id: &str) -> String {
    if !first.is_empty() {
        first
    } else if !second.is_empty() {
        second
    } else {
        strip_known_suffixes(id).to_string()
    }
}

fn display_name(db: &Database, id: &str) -> String {
    let (name, short) = contact_names(db, id);
    pick(name, short, id)
}

fn short_name(db: &Database, id: &str) -> String {
    let (name, short) = contact_names(db, id);
    pick(short, name, id)
}

fn fill_sender_names(db: &Database, msg: &mut Message) {
    let (name, short) = contact_names(db, &msg.contact_id);
    if name.is_empty() && short.is_empty() {
        // No contact record: keep whatever the backend denormalized.
        let stored_name = std::mem::take(&mut msg.contact_name);
        let stored_short = std::mem::take(&mut msg.contact_short);
        msg.contact_name = pick(stored_name.clone(), stored_short.clone(), &msg.contact_id);
        msg.contact_short = pick(stored_short, stored_name, &msg.contact_id);
    } else {
        msg.contact_name = pick(name.clone(), short.clone(), &msg.contact_id);
        msg.contact_short = pick(short, name, &msg.contact_id);
    }
}
