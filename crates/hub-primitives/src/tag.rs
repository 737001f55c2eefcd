use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A node in the organization tag forest.
///
/// Tag ids are compared byte-exact (case-sensitive); see the cycle-check
/// note in the design notes — this is a deliberate, preserved quirk of the
/// source system rather than an oversight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationTag {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrganizationTag {
    pub fn new(id: String, name: String, created_by: i64, parent_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            description: None,
            parent_id,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}
