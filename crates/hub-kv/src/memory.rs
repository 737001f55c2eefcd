use std::collections::{HashMap, HashSet};
use std::time::{Duration as StdDuration, Instant};

use async_trait::async_trait;
use chrono::Duration;
use parking_lot::RwLock;

use crate::{KvError, KvStore};

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.map(|at| Instant::now() >= at).unwrap_or(false)
    }
}

/// An in-process key-value store used in tests and as a development
/// fallback, mirroring `calimero-auth`'s `MemoryStorage`.
#[derive(Default)]
pub struct MemoryKvStore {
    data: RwLock<HashMap<String, Entry>>,
    sets: RwLock<HashMap<String, HashSet<String>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn to_std(ttl: Duration) -> StdDuration {
        ttl.to_std().unwrap_or(StdDuration::from_secs(0))
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let mut data = self.data.write();
        if let Some(entry) = data.get(key) {
            if entry.is_expired() {
                data.remove(key);
                return Ok(None);
            }
            return Ok(Some(entry.value.clone()));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        self.data.write().insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), KvError> {
        let expires_at = Instant::now() + Self::to_std(ttl);
        self.data.write().insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: Some(expires_at),
            },
        );
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvError> {
        let mut data = self.data.write();
        if let Some(entry) = data.get_mut(key) {
            entry.expires_at = Some(Instant::now() + Self::to_std(ttl));
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.data.write().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, KvError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, KvError> {
        let data = self.data.read();
        Ok(data
            .iter()
            .filter(|(k, v)| k.starts_with(prefix) && !v.is_expired())
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), KvError> {
        self.sets
            .write()
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<(), KvError> {
        if let Some(set) = self.sets.write().get_mut(key) {
            set.remove(member);
        }
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, KvError> {
        Ok(self
            .sets
            .read()
            .get(key)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_and_get_round_trips() {
        let store = MemoryKvStore::new();
        store.set("k", b"v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn ttl_expires_entries() {
        let store = MemoryKvStore::new();
        store
            .set_with_ttl("k", b"v", Duration::milliseconds(10))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn sets_add_and_remove() {
        let store = MemoryKvStore::new();
        store.sadd("s", "a").await.unwrap();
        store.sadd("s", "b").await.unwrap();
        let mut members = store.smembers("s").await.unwrap();
        members.sort();
        assert_eq!(members, vec!["a".to_string(), "b".to_string()]);
        store.srem("s", "a").await.unwrap();
        assert_eq!(store.smembers("s").await.unwrap(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn list_keys_filters_by_prefix() {
        let store = MemoryKvStore::new();
        store.set("upload:1:abc", b"1").await.unwrap();
        store.set("upload:1:def", b"1").await.unwrap();
        store.set("other", b"1").await.unwrap();
        let mut keys = store.list_keys("upload:1:").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["upload:1:abc".to_string(), "upload:1:def".to_string()]);
    }
}
