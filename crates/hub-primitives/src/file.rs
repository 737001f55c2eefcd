use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a `FileRecord`. Transitions only move forward:
/// `Uploading -> Merged -> (deleted)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileStatus {
    Uploading,
    Merged,
}

/// A file as tracked across its chunked-upload lifecycle.
///
/// Unique on `(fingerprint, owner)`: two different users may upload the
/// same bytes independently, each owning their own record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub fingerprint: String,
    pub owner: i64,
    pub filename: String,
    pub total_size: u64,
    pub status: FileStatus,
    pub scope_tag: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    pub fn new_uploading(
        fingerprint: String,
        owner: i64,
        filename: String,
        total_size: u64,
        scope_tag: String,
        is_public: bool,
    ) -> Self {
        Self {
            fingerprint,
            owner,
            filename,
            total_size,
            status: FileStatus::Uploading,
            scope_tag,
            is_public,
            created_at: Utc::now(),
            merged_at: None,
        }
    }
}

/// Metadata for a single uploaded chunk, persisted once its bytes land in
/// the object store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub fingerprint: String,
    pub index: i64,
    pub chunk_fingerprint: String,
    pub storage_path: String,
}

/// An immutable text span produced by the splitter and independently
/// embedded. Deleted only via cascade from the owning `FileRecord`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub fingerprint: String,
    pub chunk_id: i64,
    pub text: String,
    pub model_tag: String,
    pub owner: i64,
    pub scope_tag: String,
    pub is_public: bool,
}

/// The document shape stored in the hybrid search index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: String,
    pub fingerprint: String,
    pub chunk_id: i64,
    pub text: String,
    pub vector: Vec<f32>,
    pub model_tag: String,
    pub owner: i64,
    pub scope_tag: String,
    pub is_public: bool,
}
