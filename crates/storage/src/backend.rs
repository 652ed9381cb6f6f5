use std::path::{Path, PathBuf};
use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::ObjectStore;
use tracing::info;

use scaleout_core::config::S3Config;

use crate::error::StorageError;

/// Unified storage backend wrapping object_store.
pub enum StorageBackend {
    Local(LocalBackend),
    S3(S3Backend),
}

impl StorageBackend {
    /// Get the underlying ObjectStore.
    pub fn store(&self) -> &dyn ObjectStore {
        match self {
            StorageBackend::Local(b) => b.store.as_ref(),
            StorageBackend::S3(b) => b.store.as_ref(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, StorageBackend::S3(_))
    }

    /// Key prefix applied to every object (empty for local storage).
    pub fn prefix(&self) -> &str {
        match self {
            StorageBackend::Local(_) => "",
            StorageBackend::S3(b) => &b.prefix,
        }
    }

    /// Full object key for a caller-relative key.
    pub fn object_key(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        let prefix = self.prefix();
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", prefix, key)
        }
    }

    /// Public URI of a caller-relative key.
    pub fn uri_for(&self, key: &str) -> String {
        let object_key = self.object_key(key);
        match self {
            StorageBackend::Local(b) => {
                format!("file://{}/{}", b.data_dir.display(), object_key)
            }
            StorageBackend::S3(b) => format!("s3://{}/{}", b.bucket, object_key),
        }
    }

    /// Turn a dataset reference into a caller-relative key.
    ///
    /// Accepts a bare key or a fully-qualified URI pointing at this backend.
    pub fn key_from_reference(&self, reference: &str) -> Result<String, StorageError> {
        let uri_root = match self {
            StorageBackend::Local(b) => format!("file://{}/", b.data_dir.display()),
            StorageBackend::S3(b) => format!("s3://{}/", b.bucket),
        };

        let key = if let Some(rest) = reference.strip_prefix(&uri_root) {
            strip_key_prefix(rest, self.prefix())
        } else if reference.contains("://") {
            return Err(StorageError::ForeignUri(reference.to_string()));
        } else {
            reference
        };

        let key = key.trim_matches('/');
        if key.is_empty() {
            return Err(StorageError::Other(format!("empty object key in '{reference}'")));
        }
        Ok(key.to_string())
    }
}

/// Remove `prefix` from `key` only when it is a whole leading path segment.
fn strip_key_prefix<'a>(key: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return key;
    }
    match key.strip_prefix(prefix) {
        Some("") => "",
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => key,
    }
}

/// Local filesystem backend.
pub struct LocalBackend {
    pub store: Arc<dyn ObjectStore>,
    pub data_dir: PathBuf,
}

impl LocalBackend {
    pub fn new(data_dir: &Path) -> Result<Self, StorageError> {
        let canonical = std::fs::canonicalize(data_dir).unwrap_or_else(|_| data_dir.to_path_buf());
        let store = LocalFileSystem::new_with_prefix(&canonical)
            .map_err(|e| StorageError::Other(format!("local filesystem error: {e}")))?;
        info!("Storage: local backend at {}", canonical.display());
        Ok(Self {
            store: Arc::new(store),
            data_dir: canonical,
        })
    }
}

/// S3 backend (any S3-compatible endpoint).
pub struct S3Backend {
    pub store: Arc<dyn ObjectStore>,
    pub bucket: String,
    pub prefix: String,
}

impl S3Backend {
    pub fn new(s3: &S3Config) -> Result<Self, StorageError> {
        let bucket = s3
            .bucket
            .as_deref()
            .ok_or_else(|| StorageError::NotConfigured("S3_BUCKET_NAME not set".into()))?;

        let mut builder = AmazonS3Builder::new().with_region(&s3.region);

        if let Some(ref key) = s3.access_key {
            builder = builder.with_access_key_id(key);
        }
        if let Some(ref secret) = s3.secret_key {
            builder = builder.with_secret_access_key(secret);
        }

        match s3.endpoint_url.as_deref().filter(|e| !e.is_empty()) {
            Some(endpoint) => {
                // object_store requires absolute URLs
                let endpoint_url =
                    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
                        endpoint.to_string()
                    } else {
                        format!("https://{}", endpoint)
                    };
                builder = builder
                    .with_bucket_name(bucket)
                    .with_endpoint(&endpoint_url)
                    .with_allow_http(endpoint_url.starts_with("http://"));
            }
            None => {
                builder = builder.with_url(format!("s3://{}", bucket));
            }
        }

        let store = builder.build()?;

        let prefix = s3
            .prefix
            .as_deref()
            .unwrap_or("")
            .trim_matches('/')
            .to_string();

        info!(
            "Storage: S3 backend s3://{}/{} (region: {})",
            bucket, prefix, s3.region
        );

        Ok(Self {
            store: Arc::new(store),
            bucket: bucket.to_string(),
            prefix,
        })
    }
}
