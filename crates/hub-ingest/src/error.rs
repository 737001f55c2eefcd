use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("parse error: {0}")]
    Parse(String),

    /// Internal back-pressure signal; the broker is expected to redeliver
    /// the task rather than treat it as a permanent failure (spec.md §7).
    #[error("resident memory above the configured cap, task should be redelivered")]
    MemoryPressure,

    /// A pre-signed download link rejected the request outright (HTTP 403)
    /// — redelivery will not help, the link itself has expired.
    #[error("download link expired or was revoked: {0}")]
    ExpiredLink(String),

    #[error("object store error: {0}")]
    ObjectStore(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("repository error: {0}")]
    Repository(String),

    #[error("search error: {0}")]
    Search(String),
}

impl From<hub_objectstore::ObjectStoreError> for IngestError {
    fn from(e: hub_objectstore::ObjectStoreError) -> Self {
        IngestError::ObjectStore(e.to_string())
    }
}

impl From<hub_repository::RepositoryError> for IngestError {
    fn from(e: hub_repository::RepositoryError) -> Self {
        IngestError::Repository(e.to_string())
    }
}

impl From<hub_search::SearchError> for IngestError {
    fn from(e: hub_search::SearchError) -> Self {
        IngestError::Search(e.to_string())
    }
}
