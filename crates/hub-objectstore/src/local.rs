use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::fs;
use tokio::io::AsyncRead;

use crate::{ObjectStore, ObjectStoreError};

/// A filesystem-backed object store. Paths used throughout the hub
/// (`chunks/<fingerprint>/<index>`, `merged/<filename>`) are joined onto a
/// base directory, matching the `uploads` bucket layout in spec.md §6.
pub struct LocalObjectStore {
    base_dir: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(base_dir: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            public_base_url: public_base_url.into(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.base_dir.join(path)
    }

    async fn ensure_parent(path: &Path) -> Result<(), ObjectStoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), ObjectStoreError> {
        let full = self.resolve(path);
        Self::ensure_parent(&full).await?;
        fs::write(&full, bytes).await?;
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, ObjectStoreError> {
        Ok(fs::read(self.resolve(path)).await?)
    }

    async fn open_reader(
        &self,
        path: &str,
    ) -> Result<Box<dyn AsyncRead + Unpin + Send>, ObjectStoreError> {
        let file = fs::File::open(self.resolve(path)).await?;
        Ok(Box::new(file))
    }

    async fn exists(&self, path: &str) -> Result<bool, ObjectStoreError> {
        Ok(fs::metadata(self.resolve(path)).await.is_ok())
    }

    async fn len(&self, path: &str) -> Result<u64, ObjectStoreError> {
        Ok(fs::metadata(self.resolve(path)).await?.len())
    }

    async fn delete(&self, path: &str) -> Result<(), ObjectStoreError> {
        match fs::remove_file(self.resolve(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn compose(&self, parts: &[String], dest: &str) -> Result<(), ObjectStoreError> {
        for part in parts {
            if !self.exists(part).await? {
                return Err(ObjectStoreError::NotFound(part.clone()));
            }
        }
        let dest_full = self.resolve(dest);
        Self::ensure_parent(&dest_full).await?;
        let mut composed = Vec::new();
        for part in parts {
            composed.extend(self.get(part).await?);
        }
        fs::write(&dest_full, composed).await?;
        Ok(())
    }

    fn presign(&self, path: &str, ttl: Duration) -> Result<String, ObjectStoreError> {
        let expires = (Utc::now() + ttl).timestamp();
        Ok(format!(
            "{}/{}?expires={}",
            self.public_base_url.trim_end_matches('/'),
            path,
            expires
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn compose_concatenates_parts_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "http://localhost/files");
        store.put("chunks/fp/0", b"hello ").await.unwrap();
        store.put("chunks/fp/1", b"world").await.unwrap();
        store
            .compose(
                &["chunks/fp/0".to_string(), "chunks/fp/1".to_string()],
                "merged/out.txt",
            )
            .await
            .unwrap();
        let merged = store.get("merged/out.txt").await.unwrap();
        assert_eq!(merged, b"hello world");
    }

    #[tokio::test]
    async fn compose_fails_if_a_part_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "http://localhost/files");
        store.put("chunks/fp/0", b"hello").await.unwrap();
        let err = store
            .compose(
                &["chunks/fp/0".to_string(), "chunks/fp/1".to_string()],
                "merged/out.txt",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ObjectStoreError::NotFound(_)));
    }
}
