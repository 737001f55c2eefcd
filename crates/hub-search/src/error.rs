use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("embedding service error: {0}")]
    Embedding(String),

    #[error("search store error: {0}")]
    Upstream(String),

    #[error("repository error: {0}")]
    Repository(String),
}

impl From<hub_repository::RepositoryError> for SearchError {
    fn from(e: hub_repository::RepositoryError) -> Self {
        SearchError::Repository(e.to_string())
    }
}
