use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's role. Immutable once set except through the admin path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// A registered account.
///
/// `assigned_tags` is the raw, admin-managed tag set (plus the implicit
/// private tag created at registration). The *effective* tag set —
/// assigned tags closed over ancestors, plus `DEFAULT` — is computed by
/// `hub-auth`'s tag resolver, not stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub hashed_secret: String,
    pub role: Role,
    pub assigned_tags: Vec<String>,
    pub primary_tag: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: i64, login: String, hashed_secret: String, primary_tag: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            login,
            hashed_secret,
            role: Role::User,
            assigned_tags: Vec::new(),
            primary_tag: Some(primary_tag),
            created_at: now,
            updated_at: now,
        }
    }
}
