//! Contact records, merged field by field.

use chatterm_shared::Contact;
use rusqlite::params;

use crate::database::{optional, Database};
use crate::error::Result;

impl Database {
    /// Create or merge a contact.  Empty incoming fields keep the stored value.
    pub fn upsert_contact(&self, contact: &Contact) -> Result<()> {
        self.conn().execute(
            "INSERT INTO contacts (id, name, short)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                name  = CASE WHEN excluded.name  <> '' THEN excluded.name  ELSE contacts.name  END,
                short = CASE WHEN excluded.short <> '' THEN excluded.short ELSE contacts.short END",
            params![contact.id, contact.name, contact.short],
        )?;
        Ok(())
    }

    pub fn get_contact(&self, id: &str) -> Result<Option<Contact>> {
        optional(self.conn().query_row(
            "SELECT id, name, short FROM contacts WHERE id = ?1",
            params![id],
            |row| {
                Ok(Contact {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    short: row.get(2)?,
                })
            },
        ))
    }

    pub fn count_contacts(&self) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM contacts", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}
