use chatterm_shared::{MediaRef, Message};
use rusqlite::params;

use crate::database::{optional, Database};
use crate::error::Result;

const MESSAGE_COLUMNS: &str = "id, chat_id, contact_id, contact_name, contact_short, timestamp,
     from_me, forwarded, text, media_link, media_kind, media_data1, media_data2, media_data3";

impl Database {
    /// Insert a message unless its id is already stored.
    ///
    /// Returns `true` when a row was written, `false` for a duplicate.
    pub fn insert_message(&self, message: &Message) -> Result<bool> {
        let media = message.media.as_ref();
        let payload = |i: usize| media.map(|m| m.payload(i)).filter(|p| !p.is_empty());

        let affected = self.conn().execute(
            "INSERT OR IGNORE INTO messages (
                id, chat_id, contact_id, contact_name, contact_short, timestamp,
                from_me, forwarded, text, media_link, media_kind,
                media_data1, media_data2, media_data3
             )
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                message.id,
                message.chat_id,
                message.contact_id,
                message.contact_name,
                message.contact_short,
                ts_to_sql(message.timestamp),
                message.from_me,
                message.forwarded,
                message.text,
                media.map(|m| m.link.as_str()),
                media.map(|m| m.kind.as_str()),
                payload(0),
                payload(1),
                payload(2),
            ],
        )?;
        Ok(affected > 0)
    }

    /// All messages of a chat, oldest first; equal timestamps keep insertion order.
    pub fn get_messages_for_chat(&self, chat_id: &str) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM messages
             WHERE chat_id = ?1
             ORDER BY timestamp ASC, seq ASC"
        ))?;

        let rows = stmt.query_map(params![chat_id], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    pub fn get_message_by_id(&self, id: &str) -> Result<Option<Message>> {
        optional(self.conn().query_row(
            &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
            params![id],
            row_to_message,
        ))
    }

    pub fn count_messages_for_chat(&self, chat_id: &str) -> Result<usize> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM messages WHERE chat_id = ?1",
            params![chat_id],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as usize)
    }
}

/// Timestamps are unsigned in the domain model but SQLite integers are i64.
pub(crate) fn ts_to_sql(ts: u64) -> i64 {
    i64::try_from(ts).unwrap_or(i64::MAX)
}

pub(crate) fn ts_from_sql(ts: i64) -> u64 {
    u64::try_from(ts).unwrap_or(0)
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let media_link: Option<String> = row.get(9)?;
    let media_kind: Option<String> = row.get(10)?;

    let media = match media_link {
        Some(link) => {
            let mut payloads = Vec::with_capacity(3);
            for col in 11..14 {
                let data: Option<Vec<u8>> = row.get(col)?;
                payloads.push(data.unwrap_or_default());
            }
            while payloads.last().is_some_and(Vec::is_empty) {
                payloads.pop();
            }
            Some(MediaRef::new(link, media_kind.unwrap_or_default(), payloads))
        }
        None => None,
    };

    Ok(Message {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        contact_id: row.get(2)?,
        contact_name: row.get(3)?,
        contact_short: row.get(4)?,
        timestamp: ts_from_sql(row.get(5)?),
        from_me: row.get(6)?,
        forwarded: row.get(7)?,
        text: row.get(8)?,
        media,
    })
}
