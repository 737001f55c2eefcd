use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat model error: {0}")]
    Model(String),

    #[error("search error: {0}")]
    Search(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<hub_search::SearchError> for ChatError {
    fn from(e: hub_search::SearchError) -> Self {
        ChatError::Search(e.to_string())
    }
}

impl From<hub_kv::KvError> for ChatError {
    fn from(e: hub_kv::KvError) -> Self {
        ChatError::Storage(e.to_string())
    }
}
