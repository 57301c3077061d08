//! CRUD operations for [`Chat`] records.

use chatterm_shared::{is_group_id, Chat};
use rusqlite::params;

use crate::database::{optional, Database};
use crate::error::Result;
use crate::messages::{ts_from_sql, ts_to_sql};

impl Database {
    // ------------------------------------------------------------------
    // Create / merge
    // ------------------------------------------------------------------

    /// Create or merge a chat snapshot.
    ///
    /// `last_message` never moves backwards; every other field is taken from
    /// the snapshot.
    pub fn upsert_chat(&self, chat: &Chat) -> Result<()> {
        self.conn().execute(
            "INSERT INTO chats (id, is_group, name, unread, last_message)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                is_group     = excluded.is_group,
                name         = excluded.name,
                unread       = excluded.unread,
                last_message = MAX(chats.last_message, excluded.last_message)",
            params![
                chat.id,
                chat.is_group,
                chat.name,
                chat.unread,
                ts_to_sql(chat.last_message),
            ],
        )?;
        Ok(())
    }

    /// Advance a chat's last-message timestamp, creating the chat lazily.
    pub fn touch_chat(&self, chat_id: &str, timestamp: u64) -> Result<()> {
        self.conn().execute(
            "INSERT INTO chats (id, is_group, last_message)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                last_message = MAX(chats.last_message, excluded.last_message)",
            params![chat_id, is_group_id(chat_id), ts_to_sql(timestamp)],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Increment the unread counter.  Returns `false` if the chat is unknown.
    pub fn increment_unread(&self, chat_id: &str) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE chats SET unread = unread + 1 WHERE id = ?1",
            params![chat_id],
        )?;
        Ok(affected > 0)
    }

    pub fn reset_unread(&self, chat_id: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("UPDATE chats SET unread = 0 WHERE id = ?1", params![chat_id])?;
        Ok(affected > 0)
    }

    /// Set a custom chat name, creating the chat if it does not exist yet.
    pub fn rename_chat(&self, chat_id: &str, name: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO chats (id, is_group, name)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            params![chat_id, is_group_id(chat_id), name],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_chat(&self, id: &str) -> Result<Option<Chat>> {
        optional(self.conn().query_row(
            "SELECT id, is_group, name, unread, last_message FROM chats WHERE id = ?1",
            params![id],
            row_to_chat,
        ))
    }

    /// All chats, most recent first; ties keep insertion order.
    pub fn list_chats(&self) -> Result<Vec<Chat>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, is_group, name, unread, last_message
             FROM chats
             ORDER BY last_message DESC, seq ASC",
        )?;

        let rows = stmt.query_map([], row_to_chat)?;

        let mut chats = Vec::new();
        for row in rows {
            chats.push(row?);
        }
        Ok(chats)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_chat(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chat> {
    let unread: i64 = row.get(3)?;
    Ok(Chat {
        id: row.get(0)?,
        is_group: row.get(1)?,
        name: row.get(2)?,
        unread: u32::try_from(unread).unwrap_or(0),
        last_message: ts_from_sql(row.get(4)?),
    })
}
