use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object store I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ObjectStoreError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            ObjectStoreError::NotFound(e.to_string())
        } else {
            ObjectStoreError::Io(e.to_string())
        }
    }
}
