use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid argument: {0}")]
    Validation(String),

    #[error("unsupported file type: {extension}")]
    UnsupportedType { extension: String, deny_listed: bool },

    #[error("resource not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("object store error: {0}")]
    Storage(String),

    #[error("repository error: {0}")]
    Repository(String),

    #[error("queue error: {0}")]
    Queue(String),
}

impl From<hub_objectstore::ObjectStoreError> for UploadError {
    fn from(e: hub_objectstore::ObjectStoreError) -> Self {
        UploadError::Storage(e.to_string())
    }
}

impl From<hub_repository::RepositoryError> for UploadError {
    fn from(e: hub_repository::RepositoryError) -> Self {
        UploadError::Repository(e.to_string())
    }
}

impl From<hub_kv::KvError> for UploadError {
    fn from(e: hub_kv::KvError) -> Self {
        UploadError::Storage(e.to_string())
    }
}
