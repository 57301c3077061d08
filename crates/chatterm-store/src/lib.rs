//! # chatterm-store
//!
//! Local message storage for chatterm, backed by SQLite.
//!
//! [`Database`] is a synchronous `rusqlite::Connection` wrapper with typed
//! helpers for messages, chats and contacts.  [`MessageStore`] puts it behind
//! a mutex and adds the derived behaviour the session relies on: idempotent
//! inserts, monotone chat timestamps and name resolution with fallbacks.

pub mod chats;
pub mod contacts;
pub mod database;
pub mod messages;
pub mod migrations;
pub mod store;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use store::MessageStore;
