use std::collections::HashMap;

use async_trait::async_trait;
use hub_primitives::{ChunkRecord, FileRecord, OrganizationTag, Passage, Role, User};

use crate::RepositoryError;

#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError>;
    async fn find_by_login(&self, login: &str) -> Result<Option<User>, RepositoryError>;
    async fn insert(&self, user: User) -> Result<User, RepositoryError>;

    /// Admin-only mutation of a user's assigned tags and primary tag.
    async fn update_assigned_tags(
        &self,
        id: i64,
        assigned_tags: Vec<String>,
        primary_tag: Option<String>,
    ) -> Result<(), RepositoryError>;

    async fn update_role(&self, id: i64, role: Role) -> Result<(), RepositoryError>;

    /// Any user whose assigned or primary tag set references `tag_id`.
    async fn any_user_references_tag(&self, tag_id: &str) -> Result<bool, RepositoryError>;

    /// Every registered account, for the admin user-management surface.
    async fn list_all(&self) -> Result<Vec<User>, RepositoryError>;
}

#[async_trait]
pub trait TagRepository: Send + Sync + 'static {
    async fn find(&self, id: &str) -> Result<Option<OrganizationTag>, RepositoryError>;
    async fn list_all(&self) -> Result<Vec<OrganizationTag>, RepositoryError>;
    async fn list_children(&self, parent_id: &str) -> Result<Vec<OrganizationTag>, RepositoryError>;
    async fn insert(&self, tag: OrganizationTag) -> Result<OrganizationTag, RepositoryError>;
    async fn update_parent(&self, id: &str, parent_id: Option<String>) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &str) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait FileRepository: Send + Sync + 'static {
    async fn find(&self, fingerprint: &str, owner: i64) -> Result<Option<FileRecord>, RepositoryError>;
    async fn insert_uploading(&self, record: FileRecord) -> Result<(), RepositoryError>;
    async fn mark_merged(&self, fingerprint: &str, owner: i64) -> Result<(), RepositoryError>;
    async fn delete(&self, fingerprint: &str, owner: i64) -> Result<(), RepositoryError>;
    async fn list_by_owner(&self, owner: i64) -> Result<Vec<FileRecord>, RepositoryError>;

    /// Batched filename lookup over a set of fingerprints, used to enrich
    /// hybrid search results without an N+1 query pattern (spec.md §4.6 step 4).
    async fn filenames_for(&self, fingerprints: &[String]) -> Result<HashMap<String, String>, RepositoryError>;

    /// Resolve `(owner, scope_tag, is_public)` for a fingerprint, regardless
    /// of the querying user — used by the authorization guard (C7).
    async fn scope_of(&self, fingerprint: &str) -> Result<Option<(i64, String, bool)>, RepositoryError>;

    /// Every merged file visible to `caller` under `effective_tags`: public
    /// files, the caller's own files, and files scoped to a tag the caller
    /// holds (spec.md §6 `/documents/accessible`).
    async fn list_accessible(&self, caller: i64, effective_tags: &[String]) -> Result<Vec<FileRecord>, RepositoryError>;

    /// Look up a merged file by its stored filename, regardless of owner —
    /// used by `/documents/download?fileName=`, which identifies a document
    /// by name rather than by fingerprint.
    async fn find_by_filename(&self, filename: &str) -> Result<Option<FileRecord>, RepositoryError>;
}

#[async_trait]
pub trait ChunkRepository: Send + Sync + 'static {
    async fn list_by_fingerprint(&self, fingerprint: &str) -> Result<Vec<ChunkRecord>, RepositoryError>;
    async fn insert(&self, chunk: ChunkRecord) -> Result<(), RepositoryError>;
    async fn count(&self, fingerprint: &str) -> Result<usize, RepositoryError>;
    async fn delete_by_fingerprint(&self, fingerprint: &str) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait PassageRepository: Send + Sync + 'static {
    async fn insert(&self, passage: Passage) -> Result<(), RepositoryError>;
    async fn list_by_fingerprint(&self, fingerprint: &str) -> Result<Vec<Passage>, RepositoryError>;
    async fn delete_by_fingerprint(&self, fingerprint: &str) -> Result<(), RepositoryError>;
}
