use std::sync::Arc;

use chrono::Duration;
use hub_objectstore::{chunk_path, merged_path, ObjectStore};
use hub_primitives::FileRecord;
use hub_repository::{ChunkRepository, FileRepository, UserRepository};
use tracing::{info, warn};

use crate::broker::{PostMergeTask, TaskQueue};
use crate::filetype::validate_extension;
use crate::ledger::{expected_chunk_count, ChunkLedger, CHUNK_SIZE};
use crate::UploadError;

/// Short-lived download URL validity for a freshly merged document.
const PRESIGN_TTL: Duration = Duration::minutes(15);

/// Accepts chunk uploads, deduplicates, stores, marks, and on request
/// composes the final object (spec.md §4.3).
pub struct UploadCoordinator<K, F, C, U, O>
where
    K: hub_kv::KvStore,
    F: FileRepository,
    C: ChunkRepository,
    U: UserRepository,
    O: ObjectStore,
{
    ledger: ChunkLedger<K, C>,
    files: Arc<F>,
    chunks: Arc<C>,
    users: Arc<U>,
    objects: Arc<O>,
    broker: Arc<dyn TaskQueue>,
}

impl<K, F, C, U, O> UploadCoordinator<K, F, C, U, O>
where
    K: hub_kv::KvStore,
    F: FileRepository,
    C: ChunkRepository,
    U: UserRepository,
    O: ObjectStore,
{
    pub fn new(
        kv: Arc<K>,
        files: Arc<F>,
        chunks: Arc<C>,
        users: Arc<U>,
        objects: Arc<O>,
        broker: Arc<dyn TaskQueue>,
    ) -> Self {
        let ledger = ChunkLedger::new(kv, Arc::clone(&chunks));
        Self {
            ledger,
            files,
            chunks,
            users,
            objects,
            broker,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn upload_chunk(
        &self,
        fingerprint: &str,
        index: i64,
        total_size: u64,
        filename: &str,
        bytes: &[u8],
        scope_tag: Option<String>,
        is_public: bool,
        user_id: i64,
    ) -> Result<(), UploadError> {
        if index < 0 {
            return Err(UploadError::Validation(format!("chunk index {index} is negative")));
        }

        if index == 0 {
            validate_extension(filename)?;
        }

        if self.files.find(fingerprint, user_id).await?.is_none() {
            let scope_tag = match scope_tag.clone() {
                Some(tag) => tag,
                None => self
                    .users
                    .find_by_id(user_id)
                    .await?
                    .and_then(|u| u.primary_tag)
                    .unwrap_or_default(),
            };
            self.files
                .insert_uploading(FileRecord::new_uploading(
                    fingerprint.to_string(),
                    user_id,
                    filename.to_string(),
                    total_size,
                    scope_tag,
                    is_public,
                ))
                .await?;
        }

        if self.ledger.is_uploaded(user_id, fingerprint, index).await? {
            let path = chunk_path(fingerprint, index);
            let object_exists = self.objects.exists(&path).await?;
            let meta_exists = self.ledger.has_chunk_meta(fingerprint, index).await?;
            if object_exists && meta_exists {
                info!(fingerprint, index, "chunk already uploaded, replay is a no-op");
                return Ok(());
            }
            warn!(fingerprint, index, "bitmap bit set but object missing, re-uploading");
        }

        let chunk_fingerprint = format!("{:x}", md5::compute(bytes));
        let path = chunk_path(fingerprint, index);
        self.objects.put(&path, bytes).await?;
        self.ledger.mark_uploaded(user_id, fingerprint, index).await?;
        self.ledger
            .save_chunk_meta(fingerprint, index, &chunk_fingerprint, &path)
            .await?;

        Ok(())
    }

    pub async fn list_uploaded(&self, fingerprint: &str, user_id: i64) -> Result<Vec<i64>, UploadError> {
        let file = self
            .files
            .find(fingerprint, user_id)
            .await?
            .ok_or(UploadError::NotFound)?;
        self.ledger.list_uploaded(user_id, fingerprint, file.total_size).await
    }

    pub async fn merge(&self, fingerprint: &str, filename: &str, user_id: i64) -> Result<String, UploadError> {
        let file = self
            .files
            .find(fingerprint, user_id)
            .await?
            .ok_or(UploadError::NotFound)?;

        let mut chunk_records = self.chunks.list_by_fingerprint(fingerprint).await?;
        chunk_records.sort_by_key(|c| c.index);

        let expected = expected_chunk_count(file.total_size);
        if chunk_records.len() as u64 != expected {
            return Err(UploadError::Validation(format!(
                "incomplete chunks: expected {expected}, have {}",
                chunk_records.len()
            )));
        }

        let parts: Vec<String> = chunk_records.iter().map(|c| c.storage_path.clone()).collect();
        for part in &parts {
            if !self.objects.exists(part).await? {
                return Err(UploadError::Validation(format!("missing chunk object {part}")));
            }
        }

        let dest = merged_path(filename);
        self.objects.compose(&parts, &dest).await?;
        if !self.objects.exists(&dest).await? {
            return Err(UploadError::Storage("composed object missing after compose".into()));
        }

        for part in &parts {
            if let Err(e) = self.objects.delete(part).await {
                warn!(error = %e, part, "failed to delete source chunk object after merge, ignoring");
            }
        }

        self.ledger.delete_bitmap(user_id, fingerprint).await?;
        self.files.mark_merged(fingerprint, user_id).await?;

        self.broker
            .enqueue(PostMergeTask {
                fingerprint: fingerprint.to_string(),
                merged_url: dest.clone(),
                filename: filename.to_string(),
                user_id,
                scope_tag: file.scope_tag.clone(),
                is_public: file.is_public,
            })
            .await?;

        let url = self.objects.presign(&dest, PRESIGN_TTL)?;
        Ok(url)
    }
}

pub fn chunk_size() -> u64 {
    CHUNK_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::InMemoryBroker;
    use hub_kv::MemoryKvStore;
    use hub_objectstore::LocalObjectStore;
    use hub_primitives::{Role, User};
    use hub_repository::memory::InMemoryRepository;

    async fn setup() -> (
        UploadCoordinator<MemoryKvStore, InMemoryRepository, InMemoryRepository, InMemoryRepository, LocalObjectStore>,
        Arc<InMemoryRepository>,
        tempfile::TempDir,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(InMemoryRepository::new());
        let kv = Arc::new(MemoryKvStore::new());
        let objects = Arc::new(LocalObjectStore::new(dir.path(), "http://localhost/files"));
        let broker = InMemoryBroker::new();
        UserRepository::insert(
            &*repo,
            User {
                id: 0,
                login: "alice".into(),
                hashed_secret: "h".into(),
                role: Role::User,
                assigned_tags: vec![],
                primary_tag: Some("PRIVATE_alice".into()),
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            },
        )
        .await
        .unwrap();
        let coordinator = UploadCoordinator::new(
            kv,
            Arc::clone(&repo),
            Arc::clone(&repo),
            Arc::clone(&repo),
            objects,
            broker,
        );
        (coordinator, repo, dir)
    }

    #[tokio::test]
    async fn resumable_upload_end_to_end() {
        let (coordinator, _repo, _dir) = setup().await;
        let total_size = 12 * 1024 * 1024u64;
        let bytes0 = vec![0u8; CHUNK_SIZE as usize];
        let bytes1 = vec![1u8; CHUNK_SIZE as usize];
        let bytes2 = vec![2u8; (total_size - 2 * CHUNK_SIZE) as usize];

        coordinator
            .upload_chunk("fp", 0, total_size, "report.pdf", &bytes0, None, false, 1)
            .await
            .unwrap();
        coordinator
            .upload_chunk("fp", 2, total_size, "report.pdf", &bytes2, None, false, 1)
            .await
            .unwrap();

        let listed = coordinator.list_uploaded("fp", 1).await.unwrap();
        assert_eq!(listed, vec![0, 2]);

        coordinator
            .upload_chunk("fp", 1, total_size, "report.pdf", &bytes1, None, false, 1)
            .await
            .unwrap();
        let listed = coordinator.list_uploaded("fp", 1).await.unwrap();
        assert_eq!(listed, vec![0, 1, 2]);

        let url = coordinator.merge("fp", "report.pdf", 1).await.unwrap();
        assert!(url.contains("merged/report.pdf"));
    }

    #[tokio::test]
    async fn replaying_identical_chunk_is_idempotent() {
        let (coordinator, _repo, _dir) = setup().await;
        let bytes = vec![7u8; 1024];
        coordinator
            .upload_chunk("fp2", 1, 2 * CHUNK_SIZE, "notes.txt", &bytes, None, false, 1)
            .await
            .unwrap();
        coordinator
            .upload_chunk("fp2", 1, 2 * CHUNK_SIZE, "notes.txt", &bytes, None, false, 1)
            .await
            .unwrap();
        assert_eq!(
            ChunkRepository::list_by_fingerprint(&*_repo, "fp2").await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn unsupported_extension_on_first_chunk_is_rejected() {
        let (coordinator, repo, _dir) = setup().await;
        let err = coordinator
            .upload_chunk("fp3", 0, 1024, "malware.exe", b"MZ", None, false, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedType { .. }));
        assert!(FileRepository::find(&*repo, "fp3", 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn merge_with_incomplete_chunks_is_rejected() {
        let (coordinator, _repo, _dir) = setup().await;
        let bytes = vec![1u8; 1024];
        coordinator
            .upload_chunk("fp4", 0, 2 * CHUNK_SIZE, "a.txt", &bytes, None, false, 1)
            .await
            .unwrap();
        let err = coordinator.merge("fp4", "a.txt", 1).await.unwrap_err();
        assert!(matches!(err, UploadError::Validation(_)));
    }
}
