use std::path::Path;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rocksdb::{IteratorMode, DB};

use crate::{KvError, KvStore};

const SET_COLUMN_SUFFIX: &str = "\u{0}set\u{0}";

/// RocksDB-backed key-value store for deployment, mirroring
/// `calimero-auth::storage::rocksdb::RocksDBStorage`.
///
/// Expiry is stored as an 8-byte big-endian millisecond timestamp prefix on
/// the value; entries are lazily evicted on read. Sets are represented as a
/// namespaced family of keys `<key><SET_COLUMN_SUFFIX><member>`.
pub struct RocksDbKvStore {
    db: DB,
}

impl RocksDbKvStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, KvError> {
        let mut options = rocksdb::Options::default();
        options.create_if_missing(true);
        options.create_missing_column_families(true);
        let db = DB::open(&options, path)
            .map_err(|e| KvError::Backend(format!("failed to open rocksdb: {e}")))?;
        Ok(Self { db })
    }

    fn encode(value: &[u8], expires_at_ms: Option<i64>) -> Vec<u8> {
        let mut out = Vec::with_capacity(9 + value.len());
        match expires_at_ms {
            Some(ms) => {
                out.push(1);
                out.extend_from_slice(&ms.to_be_bytes());
            }
            None => {
                out.push(0);
                out.extend_from_slice(&0i64.to_be_bytes());
            }
        }
        out.extend_from_slice(value);
        out
    }

    fn decode(raw: &[u8]) -> Option<(Option<i64>, Vec<u8>)> {
        if raw.len() < 9 {
            return None;
        }
        let has_ttl = raw[0] == 1;
        let ms = i64::from_be_bytes(raw[1..9].try_into().ok()?);
        let value = raw[9..].to_vec();
        Some((if has_ttl { Some(ms) } else { None }, value))
    }
}

#[async_trait]
impl KvStore for RocksDbKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let raw = self
            .db
            .get(key.as_bytes())
            .map_err(|e| KvError::Backend(e.to_string()))?;
        let Some(raw) = raw else { return Ok(None) };
        let Some((expires_at, value)) = Self::decode(&raw) else {
            return Ok(None);
        };
        if let Some(ms) = expires_at {
            if Utc::now().timestamp_millis() >= ms {
                self.db
                    .delete(key.as_bytes())
                    .map_err(|e| KvError::Backend(e.to_string()))?;
                return Ok(None);
            }
        }
        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        self.db
            .put(key.as_bytes(), Self::encode(value, None))
            .map_err(|e| KvError::Backend(e.to_string()))
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), KvError> {
        let expires_at = (Utc::now() + ttl).timestamp_millis();
        self.db
            .put(key.as_bytes(), Self::encode(value, Some(expires_at)))
            .map_err(|e| KvError::Backend(e.to_string()))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvError> {
        if let Some(value) = self.get(key).await? {
            self.set_with_ttl(key, &value, ttl).await?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.db
            .delete(key.as_bytes())
            .map_err(|e| KvError::Backend(e.to_string()))
    }

    async fn exists(&self, key: &str) -> Result<bool, KvError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, KvError> {
        let mut out = Vec::new();
        let iter = self.db.iterator(IteratorMode::From(
            prefix.as_bytes(),
            rocksdb::Direction::Forward,
        ));
        for item in iter {
            let (k, _) = item.map_err(|e| KvError::Backend(e.to_string()))?;
            let Ok(key_str) = std::str::from_utf8(&k) else {
                continue;
            };
            if !key_str.starts_with(prefix) {
                break;
            }
            if key_str.contains(SET_COLUMN_SUFFIX) {
                continue;
            }
            out.push(key_str.to_string());
        }
        Ok(out)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), KvError> {
        let full = format!("{key}{SET_COLUMN_SUFFIX}{member}");
        self.set(&full, &[]).await
    }

    async fn srem(&self, key: &str, member: &str) -> Result<(), KvError> {
        let full = format!("{key}{SET_COLUMN_SUFFIX}{member}");
        self.delete(&full).await
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, KvError> {
        let prefix = format!("{key}{SET_COLUMN_SUFFIX}");
        let keys = self.list_keys(&prefix).await?;
        Ok(keys
            .into_iter()
            .map(|k| k[prefix.len()..].to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_through_rocksdb() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksDbKvStore::new(dir.path()).unwrap();
        store.set("k", b"v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
        store.sadd("set", "a").await.unwrap();
        assert_eq!(store.smembers("set").await.unwrap(), vec!["a".to_string()]);
    }
}
