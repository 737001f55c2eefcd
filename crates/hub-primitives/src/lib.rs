//! Shared domain types for the knowledge hub.
//!
//! These types are intentionally persistence-agnostic: they carry no
//! knowledge of the relational store, the KV store, or the search index.
//! Each downstream crate (`hub-repository`, `hub-kv`, `hub-search`, ...)
//! maps these types onto its own storage representation.

pub mod conversation;
pub mod file;
pub mod session;
pub mod tag;
pub mod user;

pub use conversation::{Conversation, Message, MessageRole};
pub use file::{ChunkRecord, FileRecord, FileStatus, Passage, SearchDocument};
pub use session::SessionHandle;
pub use tag::OrganizationTag;
pub use user::{Role, User};

/// Well-known tag id that grants universal read access.
pub const DEFAULT_TAG: &str = "DEFAULT";

/// Prefix for a user's implicit private tag, e.g. `PRIVATE_alice`.
pub const PRIVATE_TAG_PREFIX: &str = "PRIVATE_";

/// Build the private tag id for a given login name.
pub fn private_tag_for(login: &str) -> String {
    format!("{PRIVATE_TAG_PREFIX}{login}")
}
