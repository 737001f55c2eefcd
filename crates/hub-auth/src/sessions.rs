use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use hub_kv::{deserialize, keys, serialize, KvStore};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::AuthError;

/// Default session handle lifetime.
pub const SESSION_TTL: Duration = Duration::hours(1);
/// Default refresh handle lifetime.
pub const REFRESH_TTL: Duration = Duration::days(7);
/// Grace window added on top of a session's logical expiry before the
/// underlying KV entry is actually evicted (spec.md §4.9).
pub const VALIDITY_GRACE: Duration = Duration::minutes(5);
/// A session handle within this window of expiring is proactively rotated.
pub const REFRESH_THRESHOLD: Duration = Duration::minutes(5);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ValidityRecord {
    subject: i64,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RefreshRecord {
    subject: i64,
}

#[derive(Debug, Clone)]
pub struct SessionIssue {
    pub session_handle: String,
    pub refresh_handle: String,
    pub expires_at: DateTime<Utc>,
}

fn random_handle() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Opaque session/refresh handle issuance and validation, backed by the
/// shared fast KV store (spec.md §4.9).
pub struct SessionStore<K: KvStore> {
    kv: Arc<K>,
}

impl<K: KvStore> SessionStore<K> {
    pub fn new(kv: Arc<K>) -> Self {
        Self { kv }
    }

    /// Issue a fresh session handle and refresh handle for `subject`.
    pub async fn issue(&self, subject: i64) -> Result<SessionIssue, AuthError> {
        let session_handle = random_handle();
        let refresh_handle = random_handle();
        let expires_at = Utc::now() + SESSION_TTL;

        let record = ValidityRecord { subject, expires_at };
        let value = serialize(&record).map_err(|e| AuthError::Storage(e.to_string()))?;
        self.kv
            .set_with_ttl(&keys::session_valid(&session_handle), &value, SESSION_TTL + VALIDITY_GRACE)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        self.kv
            .sadd(&keys::user_tokens(subject), &session_handle)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        let refresh_value =
            serialize(&RefreshRecord { subject }).map_err(|e| AuthError::Storage(e.to_string()))?;
        self.kv
            .set_with_ttl(&keys::refresh_handle(&refresh_handle), &refresh_value, REFRESH_TTL)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        Ok(SessionIssue {
            session_handle,
            refresh_handle,
            expires_at,
        })
    }

    /// Validate a session handle, returning the subject if it is listed and
    /// not blacklisted.
    pub async fn validate(&self, handle: &str) -> Result<i64, AuthError> {
        if self
            .kv
            .exists(&keys::session_blacklist(handle))
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?
        {
            return Err(AuthError::AuthenticationFailed("session revoked".into()));
        }
        let raw = self
            .kv
            .get(&keys::session_valid(handle))
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?
            .ok_or_else(|| AuthError::AuthenticationFailed("unknown session".into()))?;
        let record: ValidityRecord = deserialize(&raw).map_err(|e| AuthError::Storage(e.to_string()))?;
        if Utc::now() >= record.expires_at {
            return Err(AuthError::AuthenticationFailed("session expired".into()));
        }
        Ok(record.subject)
    }

    /// Revoke a single session handle.
    pub async fn logout(&self, handle: &str) -> Result<(), AuthError> {
        let raw = self
            .kv
            .get(&keys::session_valid(handle))
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        let remaining = match raw {
            Some(ref bytes) => {
                let record: ValidityRecord =
                    deserialize(bytes).map_err(|e| AuthError::Storage(e.to_string()))?;
                let remaining = record.expires_at - Utc::now();
                self.kv
                    .srem(&keys::user_tokens(record.subject), handle)
                    .await
                    .map_err(|e| AuthError::Storage(e.to_string()))?;
                remaining
            }
            None => Duration::zero(),
        };
        let ttl = remaining.max(Duration::zero());
        self.kv
            .set_with_ttl(&keys::session_blacklist(handle), b"1", ttl)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        self.kv
            .delete(&keys::session_valid(handle))
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))
    }

    /// Revoke every session handle issued to `subject`.
    pub async fn logout_all(&self, subject: i64) -> Result<(), AuthError> {
        let handles = self
            .kv
            .smembers(&keys::user_tokens(subject))
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        for handle in handles {
            self.logout(&handle).await?;
        }
        Ok(())
    }

    /// Mint a fresh session handle from a still-valid refresh handle.
    pub async fn refresh(&self, refresh_handle: &str) -> Result<SessionIssue, AuthError> {
        let raw = self
            .kv
            .get(&keys::refresh_handle(refresh_handle))
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?
            .ok_or_else(|| AuthError::AuthenticationFailed("unknown refresh handle".into()))?;
        let record: RefreshRecord = deserialize(&raw).map_err(|e| AuthError::Storage(e.to_string()))?;
        self.issue(record.subject).await
    }

    /// If `issued.expires_at` is within `REFRESH_THRESHOLD`, proactively
    /// mint a replacement session handle; otherwise return `None`.
    pub async fn maybe_rotate(&self, subject: i64, expires_at: DateTime<Utc>) -> Result<Option<SessionIssue>, AuthError> {
        if expires_at - Utc::now() <= REFRESH_THRESHOLD {
            return Ok(Some(self.issue(subject).await?));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_kv::MemoryKvStore;

    #[tokio::test]
    async fn issued_session_validates() {
        let store = SessionStore::new(Arc::new(MemoryKvStore::new()));
        let issued = store.issue(42).await.unwrap();
        let subject = store.validate(&issued.session_handle).await.unwrap();
        assert_eq!(subject, 42);
    }

    #[tokio::test]
    async fn logout_blacklists_handle() {
        let store = SessionStore::new(Arc::new(MemoryKvStore::new()));
        let issued = store.issue(1).await.unwrap();
        store.logout(&issued.session_handle).await.unwrap();
        assert!(store.validate(&issued.session_handle).await.is_err());
    }

    #[tokio::test]
    async fn logout_all_revokes_every_handle() {
        let store = SessionStore::new(Arc::new(MemoryKvStore::new()));
        let a = store.issue(7).await.unwrap();
        let b = store.issue(7).await.unwrap();
        store.logout_all(7).await.unwrap();
        assert!(store.validate(&a.session_handle).await.is_err());
        assert!(store.validate(&b.session_handle).await.is_err());
    }

    #[tokio::test]
    async fn refresh_mints_new_session_handle() {
        let store = SessionStore::new(Arc::new(MemoryKvStore::new()));
        let issued = store.issue(3).await.unwrap();
        let rotated = store.refresh(&issued.refresh_handle).await.unwrap();
        assert_ne!(issued.session_handle, rotated.session_handle);
        assert_eq!(store.validate(&rotated.session_handle).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn refresh_handle_cannot_validate_as_session() {
        let store = SessionStore::new(Arc::new(MemoryKvStore::new()));
        let issued = store.issue(9).await.unwrap();
        assert!(store.validate(&issued.refresh_handle).await.is_err());
    }
}
