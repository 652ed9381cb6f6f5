pub mod backend;
pub mod error;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

pub use backend::{LocalBackend, S3Backend, StorageBackend};
pub use error::StorageError;

/// The storage collaborator the pipeline consumes: fetch a dataset to a
/// local file, push a local artifact into a destination folder.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Normalize `reference` (a bare key or a URI of this store) to a bare
    /// object key.
    fn resolve_key(&self, reference: &str) -> Result<String, StorageError> {
        Ok(reference.trim_start_matches('/').to_string())
    }

    /// Download `reference` (a bare key or a URI of this store) into
    /// `dest_dir`, returning the local path. The local file is named after
    /// the key's last segment.
    async fn download(&self, reference: &str, dest_dir: &Path) -> Result<PathBuf, StorageError>;

    /// Upload `local_path` to `<folder>/<file name>` and return its URI.
    async fn upload(&self, local_path: &Path, folder: &str) -> Result<String, StorageError>;
}

/// Config-driven storage: S3 when credentials are present, otherwise the
/// local filesystem under `DATA_DIR`.
pub struct StorageEngine {
    pub backend: StorageBackend,
}

impl StorageEngine {
    pub fn new(backend: StorageBackend) -> Self {
        Self { backend }
    }

    /// Create a StorageEngine from config. Selects local or S3 based on S3Config.
    pub fn from_config(config: &scaleout_core::Config) -> Result<Self, StorageError> {
        if config.s3.is_configured() {
            let s3 = S3Backend::new(&config.s3)?;
            Ok(Self::new(StorageBackend::S3(s3)))
        } else {
            std::fs::create_dir_all(&config.storage.data_dir)?;
            let local = LocalBackend::new(&config.storage.data_dir)?;
            Ok(Self::new(StorageBackend::Local(local)))
        }
    }

    /// Local storage rooted at `data_dir`.
    pub fn local(data_dir: &Path) -> Result<Self, StorageError> {
        Ok(Self::new(StorageBackend::Local(LocalBackend::new(data_dir)?)))
    }
}

#[async_trait]
impl ObjectStorage for StorageEngine {
    fn resolve_key(&self, reference: &str) -> Result<String, StorageError> {
        self.backend.key_from_reference(reference)
    }

    async fn download(&self, reference: &str, dest_dir: &Path) -> Result<PathBuf, StorageError> {
        let key = self.resolve_key(reference)?;
        let file_name = key.rsplit('/').next().unwrap_or(key.as_str()).to_string();

        let location = object_store::path::Path::from(self.backend.object_key(&key));
        let data = self.backend.store().get(&location).await?.bytes().await?;

        tokio::fs::create_dir_all(dest_dir).await?;
        let local_path = dest_dir.join(&file_name);
        tokio::fs::write(&local_path, &data).await?;

        info!(
            key = %key,
            bytes = data.len(),
            local = %local_path.display(),
            "downloaded dataset"
        );
        Ok(local_path)
    }

    async fn upload(&self, local_path: &Path, folder: &str) -> Result<String, StorageError> {
        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                StorageError::Other(format!("no file name in {}", local_path.display()))
            })?;

        let folder = folder.trim_matches('/');
        let key = if folder.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", folder, file_name)
        };

        let data = tokio::fs::read(local_path).await?;
        let size = data.len();
        let location = object_store::path::Path::from(self.backend.object_key(&key));
        self.backend
            .store()
            .put(&location, bytes::Bytes::from(data).into())
            .await?;

        let uri = self.backend.uri_for(&key);
        debug!(uri = %uri, bytes = size, "uploaded artifact");
        Ok(uri)
    }
}
