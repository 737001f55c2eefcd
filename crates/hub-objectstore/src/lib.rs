//! Object store abstraction standing in for the "external" object-store SDK
//! referenced in spec.md §1. Chunk bytes land at `chunks/<fingerprint>/<index>`
//! and merged documents at `merged/<filename>` (spec.md §6).

mod error;
mod local;

pub use error::ObjectStoreError;
pub use local::LocalObjectStore;

use async_trait::async_trait;
use chrono::Duration;
use tokio::io::AsyncRead;

pub fn chunk_path(fingerprint: &str, index: i64) -> String {
    format!("chunks/{fingerprint}/{index}")
}

pub fn merged_path(filename: &str) -> String {
    format!("merged/{filename}")
}

#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), ObjectStoreError>;

    async fn get(&self, path: &str) -> Result<Vec<u8>, ObjectStoreError>;

    /// Open a streaming reader over the object — used by the ingestion
    /// worker so it never has to hold a multi-hundred-megabyte document in
    /// memory before handing it to the text extractor.
    async fn open_reader(
        &self,
        path: &str,
    ) -> Result<Box<dyn AsyncRead + Unpin + Send>, ObjectStoreError>;

    async fn exists(&self, path: &str) -> Result<bool, ObjectStoreError>;

    async fn len(&self, path: &str) -> Result<u64, ObjectStoreError>;

    async fn delete(&self, path: &str) -> Result<(), ObjectStoreError>;

    /// Invoke the store's native composition primitive, concatenating
    /// `parts` in order into `dest`. Refuses (returns an error) unless every
    /// part exists.
    async fn compose(&self, parts: &[String], dest: &str) -> Result<(), ObjectStoreError>;

    /// A short-lived pre-signed URL good for direct client download.
    fn presign(&self, path: &str, ttl: Duration) -> Result<String, ObjectStoreError>;
}
