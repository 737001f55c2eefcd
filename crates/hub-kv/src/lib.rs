//! A small key-value abstraction backing the three pieces of shared mutable
//! state the knowledge hub needs: upload bitmaps, session handles, and
//! chat conversations (see design note in `spec.md` §5: "the sole required
//! shared mutable state is the KV store").
//!
//! The trait is deliberately narrow — get/set/delete/exists/list plus TTL
//! and a tiny set abstraction for `user:<id>:tokens` — so that swapping the
//! in-memory test backend for a real one (RocksDB here, Redis in a real
//! deployment) never touches call sites.

mod error;
mod memory;
#[cfg(feature = "rocksdb-backend")]
mod rocksdb_store;

pub use error::KvError;
pub use memory::MemoryKvStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocksdb_store::RocksDbKvStore;

use async_trait::async_trait;
use chrono::Duration;

/// A key-value store with TTL and a minimal set abstraction.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError>;

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError>;

    /// Set a value with a time-to-live. Implementations must evict the key
    /// once it expires (lazily on read is sufficient).
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), KvError>;

    /// Renew the TTL of an existing key without touching its value
    /// (sliding expiration). A no-op if the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvError>;

    async fn delete(&self, key: &str) -> Result<(), KvError>;

    async fn exists(&self, key: &str) -> Result<bool, KvError>;

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, KvError>;

    /// Add `member` to the set stored under `key`.
    async fn sadd(&self, key: &str, member: &str) -> Result<(), KvError>;

    /// Remove `member` from the set stored under `key`.
    async fn srem(&self, key: &str, member: &str) -> Result<(), KvError>;

    /// All members of the set stored under `key`.
    async fn smembers(&self, key: &str) -> Result<Vec<String>, KvError>;
}

/// Serialize a value to JSON for storage. Kept as a free function (rather
/// than a trait default) so backends can store raw bytes without pulling in
/// serde bounds on the trait itself.
pub fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, KvError> {
    serde_json::to_vec(value).map_err(|e| KvError::Serialization(e.to_string()))
}

pub fn deserialize<T: for<'de> serde::Deserialize<'de>>(data: &[u8]) -> Result<T, KvError> {
    serde_json::from_slice(data).map_err(|e| KvError::Serialization(e.to_string()))
}

pub mod keys {
    //! Key-naming helpers, centralized so every caller agrees on the
    //! layout described in spec.md §4.2, §4.9.

    pub fn upload_bitmap(user_id: i64, fingerprint: &str) -> String {
        format!("upload:{user_id}:{fingerprint}")
    }

    pub fn session_valid(handle: &str) -> String {
        format!("valid:{handle}")
    }

    pub fn session_blacklist(handle: &str) -> String {
        format!("blacklist:{handle}")
    }

    pub fn user_tokens(subject: i64) -> String {
        format!("user:{subject}:tokens")
    }

    pub fn refresh_handle(handle: &str) -> String {
        format!("refresh:{handle}")
    }

    pub fn conversation(owner: i64) -> String {
        format!("conversation:{owner}")
    }
}
