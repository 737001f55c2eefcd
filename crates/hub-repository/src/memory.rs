use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use hub_primitives::{ChunkRecord, FileRecord, FileStatus, OrganizationTag, Passage, Role, User};
use parking_lot::RwLock;

use crate::{ChunkRepository, FileRepository, PassageRepository, RepositoryError, TagRepository, UserRepository};

/// An in-process implementation of every repository trait, used in unit
/// tests and as the development default for `hub-server`.
#[derive(Default)]
pub struct InMemoryRepository {
    users: RwLock<HashMap<i64, User>>,
    users_by_login: RwLock<HashMap<String, i64>>,
    next_user_id: AtomicI64,
    tags: RwLock<HashMap<String, OrganizationTag>>,
    files: RwLock<HashMap<(String, i64), FileRecord>>,
    chunks: RwLock<HashMap<String, Vec<ChunkRecord>>>,
    passages: RwLock<HashMap<String, Vec<Passage>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            next_user_id: AtomicI64::new(1),
            ..Default::default()
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().get(&id).cloned())
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, RepositoryError> {
        let Some(id) = self.users_by_login.read().get(login).copied() else {
            return Ok(None);
        };
        Ok(self.users.read().get(&id).cloned())
    }

    async fn insert(&self, mut user: User) -> Result<User, RepositoryError> {
        if self.users_by_login.read().contains_key(&user.login) {
            return Err(RepositoryError::Conflict(format!(
                "login {} already exists",
                user.login
            )));
        }
        user.id = self.next_user_id.fetch_add(1, Ordering::SeqCst);
        self.users_by_login
            .write()
            .insert(user.login.clone(), user.id);
        self.users.write().insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_assigned_tags(
        &self,
        id: i64,
        assigned_tags: Vec<String>,
        primary_tag: Option<String>,
    ) -> Result<(), RepositoryError> {
        let mut users = self.users.write();
        let user = users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        user.assigned_tags = assigned_tags;
        user.primary_tag = primary_tag;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn update_role(&self, id: i64, role: Role) -> Result<(), RepositoryError> {
        let mut users = self.users.write();
        let user = users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        user.role = role;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn any_user_references_tag(&self, tag_id: &str) -> Result<bool, RepositoryError> {
        Ok(self.users.read().values().any(|u| {
            u.assigned_tags.iter().any(|t| t == tag_id)
                || u.primary_tag.as_deref() == Some(tag_id)
        }))
    }

    async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(self.users.read().values().cloned().collect())
    }
}

#[async_trait]
impl TagRepository for InMemoryRepository {
    async fn find(&self, id: &str) -> Result<Option<OrganizationTag>, RepositoryError> {
        Ok(self.tags.read().get(id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<OrganizationTag>, RepositoryError> {
        Ok(self.tags.read().values().cloned().collect())
    }

    async fn list_children(&self, parent_id: &str) -> Result<Vec<OrganizationTag>, RepositoryError> {
        Ok(self
            .tags
            .read()
            .values()
            .filter(|t| t.parent_id.as_deref() == Some(parent_id))
            .cloned()
            .collect())
    }

    async fn insert(&self, tag: OrganizationTag) -> Result<OrganizationTag, RepositoryError> {
        let mut tags = self.tags.write();
        if tags.contains_key(&tag.id) {
            return Err(RepositoryError::Conflict(format!(
                "tag {} already exists",
                tag.id
            )));
        }
        tags.insert(tag.id.clone(), tag.clone());
        Ok(tag)
    }

    async fn update_parent(&self, id: &str, parent_id: Option<String>) -> Result<(), RepositoryError> {
        let mut tags = self.tags.write();
        let tag = tags.get_mut(id).ok_or(RepositoryError::NotFound)?;
        tag.parent_id = parent_id;
        tag.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        if self.tags.write().remove(id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl FileRepository for InMemoryRepository {
    async fn find(&self, fingerprint: &str, owner: i64) -> Result<Option<FileRecord>, RepositoryError> {
        Ok(self
            .files
            .read()
            .get(&(fingerprint.to_string(), owner))
            .cloned())
    }

    async fn insert_uploading(&self, record: FileRecord) -> Result<(), RepositoryError> {
        let key = (record.fingerprint.clone(), record.owner);
        self.files.write().insert(key, record);
        Ok(())
    }

    async fn mark_merged(&self, fingerprint: &str, owner: i64) -> Result<(), RepositoryError> {
        let mut files = self.files.write();
        let record = files
            .get_mut(&(fingerprint.to_string(), owner))
            .ok_or(RepositoryError::NotFound)?;
        record.status = FileStatus::Merged;
        record.merged_at = Some(Utc::now());
        Ok(())
    }

    async fn delete(&self, fingerprint: &str, owner: i64) -> Result<(), RepositoryError> {
        if self
            .files
            .write()
            .remove(&(fingerprint.to_string(), owner))
            .is_none()
        {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_by_owner(&self, owner: i64) -> Result<Vec<FileRecord>, RepositoryError> {
        Ok(self
            .files
            .read()
            .values()
            .filter(|f| f.owner == owner)
            .cloned()
            .collect())
    }

    async fn filenames_for(&self, fingerprints: &[String]) -> Result<HashMap<String, String>, RepositoryError> {
        let files = self.files.read();
        let mut out = HashMap::new();
        for fp in fingerprints {
            if let Some((_, record)) = files.iter().find(|((f, _), _)| f == fp) {
                out.insert(fp.clone(), record.filename.clone());
            }
        }
        Ok(out)
    }

    async fn scope_of(&self, fingerprint: &str) -> Result<Option<(i64, String, bool)>, RepositoryError> {
        let files = self.files.read();
        Ok(files
            .iter()
            .find(|((f, _), _)| f == fingerprint)
            .map(|(_, r)| (r.owner, r.scope_tag.clone(), r.is_public)))
    }

    async fn list_accessible(&self, caller: i64, effective_tags: &[String]) -> Result<Vec<FileRecord>, RepositoryError> {
        Ok(self
            .files
            .read()
            .values()
            .filter(|f| matches!(f.status, FileStatus::Merged))
            .filter(|f| f.is_public || f.owner == caller || effective_tags.iter().any(|t| t == &f.scope_tag))
            .cloned()
            .collect())
    }

    async fn find_by_filename(&self, filename: &str) -> Result<Option<FileRecord>, RepositoryError> {
        Ok(self
            .files
            .read()
            .values()
            .find(|f| f.filename == filename)
            .cloned())
    }
}

#[async_trait]
impl ChunkRepository for InMemoryRepository {
    async fn list_by_fingerprint(&self, fingerprint: &str) -> Result<Vec<ChunkRecord>, RepositoryError> {
        let mut chunks = self
            .chunks
            .read()
            .get(fingerprint)
            .cloned()
            .unwrap_or_default();
        chunks.sort_by_key(|c| c.index);
        Ok(chunks)
    }

    async fn insert(&self, chunk: ChunkRecord) -> Result<(), RepositoryError> {
        let mut chunks = self.chunks.write();
        let entry = chunks.entry(chunk.fingerprint.clone()).or_default();
        if !entry.iter().any(|c| c.index == chunk.index) {
            entry.push(chunk);
        }
        Ok(())
    }

    async fn count(&self, fingerprint: &str) -> Result<usize, RepositoryError> {
        Ok(self.chunks.read().get(fingerprint).map(Vec::len).unwrap_or(0))
    }

    async fn delete_by_fingerprint(&self, fingerprint: &str) -> Result<(), RepositoryError> {
        self.chunks.write().remove(fingerprint);
        Ok(())
    }
}

#[async_trait]
impl PassageRepository for InMemoryRepository {
    async fn insert(&self, passage: Passage) -> Result<(), RepositoryError> {
        self.passages
            .write()
            .entry(passage.fingerprint.clone())
            .or_default()
            .push(passage);
        Ok(())
    }

    async fn list_by_fingerprint(&self, fingerprint: &str) -> Result<Vec<Passage>, RepositoryError> {
        Ok(self
            .passages
            .read()
            .get(fingerprint)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_by_fingerprint(&self, fingerprint: &str) -> Result<(), RepositoryError> {
        self.passages.write().remove(fingerprint);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn user_insert_and_lookup() {
        let repo = InMemoryRepository::new();
        let user = User::new(0, "alice".into(), "hash".into(), "PRIVATE_alice".into());
        let inserted = UserRepository::insert(&repo, user).await.unwrap();
        assert_eq!(inserted.id, 1);
        let found = repo.find_by_login("alice").await.unwrap().unwrap();
        assert_eq!(found.id, inserted.id);
    }

    #[tokio::test]
    async fn duplicate_chunk_insert_is_idempotent() {
        let repo = InMemoryRepository::new();
        let chunk = ChunkRecord {
            fingerprint: "fp".into(),
            index: 0,
            chunk_fingerprint: "cfp".into(),
            storage_path: "chunks/fp/0".into(),
        };
        ChunkRepository::insert(&repo, chunk.clone()).await.unwrap();
        ChunkRepository::insert(&repo, chunk).await.unwrap();
        assert_eq!(repo.count("fp").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn tag_deletion_respects_not_found() {
        let repo = InMemoryRepository::new();
        assert!(matches!(
            TagRepository::delete(&repo, "missing").await,
            Err(RepositoryError::NotFound)
        ));
    }
}
