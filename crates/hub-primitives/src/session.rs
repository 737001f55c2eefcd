use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An opaque session or refresh handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHandle {
    pub id: String,
    pub subject: i64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl SessionHandle {
    pub fn new(id: String, subject: i64, ttl: chrono::Duration) -> Self {
        let now = Utc::now();
        Self {
            id,
            subject,
            issued_at: now,
            expires_at: now + ttl,
            revoked: false,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}
