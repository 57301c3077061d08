//! # chatterm-shared
//!
//! Domain types shared by the store, the backends and the client: messages,
//! chats, contacts, commands and the derived session status.

pub mod constants;
pub mod types;

pub use types::*;
