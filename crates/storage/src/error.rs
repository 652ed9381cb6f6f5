use thiserror::Error;

use scaleout_core::PipelineError;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URI does not belong to this storage backend: {0}")]
    ForeignUri(String),

    #[error("not configured: {0}")]
    NotConfigured(String),

    #[error("{0}")]
    Other(String),
}

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ObjectStore(object_store::Error::NotFound { path, .. }) => {
                PipelineError::NotFound(path)
            }
            other => PipelineError::Storage(other.to_string()),
        }
    }
}
