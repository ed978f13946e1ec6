use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("blob store error: {0}")]
    Blob(#[from] opendal::Error),
    #[error("metadata store error: {0}")]
    Metadata(String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StorageError {
    pub fn status_code(&self) -> u16 {
        match self {
            StorageError::NotFound(_) => 404,
            StorageError::Blob(_) => 502,
            StorageError::Metadata(_) => 502,
            StorageError::Serde(_) => 500,
        }
    }
}
