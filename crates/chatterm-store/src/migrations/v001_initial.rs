//! v001 -- Initial schema creation.
//!
//! Creates the three core tables: `chats`, `messages` and `contacts`.
//! `seq` columns record insertion order and break timestamp ties.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Chats
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS chats (
    seq          INTEGER PRIMARY KEY AUTOINCREMENT,
    id           TEXT NOT NULL UNIQUE,
    is_group     INTEGER NOT NULL DEFAULT 0,   -- boolean 0/1
    name         TEXT NOT NULL DEFAULT '',
    unread       INTEGER NOT NULL DEFAULT 0,
    last_message INTEGER NOT NULL DEFAULT 0    -- unix seconds
);

CREATE INDEX IF NOT EXISTS idx_chats_last_message
    ON chats(last_message DESC, seq ASC);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    seq           INTEGER PRIMARY KEY AUTOINCREMENT,
    id            TEXT NOT NULL UNIQUE,        -- backend message id
    chat_id       TEXT NOT NULL,
    contact_id    TEXT NOT NULL,
    contact_name  TEXT NOT NULL DEFAULT '',
    contact_short TEXT NOT NULL DEFAULT '',
    timestamp     INTEGER NOT NULL,            -- unix seconds
    from_me       INTEGER NOT NULL DEFAULT 0,
    forwarded     INTEGER NOT NULL DEFAULT 0,
    text          TEXT NOT NULL DEFAULT '',
    media_link    TEXT,
    media_kind    TEXT,
    -- key / hash material needed to fetch the attachment later
    media_data1   BLOB,
    media_data2   BLOB,
    media_data3   BLOB
);

CREATE INDEX IF NOT EXISTS idx_messages_chat_ts
    ON messages(chat_id, timestamp ASC, seq ASC);

-- ----------------------------------------------------------------
-- Contacts
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS contacts (
    id    TEXT PRIMARY KEY NOT NULL,
    name  TEXT NOT NULL DEFAULT '',
    short TEXT NOT NULL DEFAULT ''
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
