use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use scaleout_core::config::ComputeConfig;
use scaleout_core::{JobConfig, JobRequest};
use scaleout_pipeline::PipelineOrchestrator;
use scaleout_storage::{ObjectStorage, StorageEngine, StorageError};

pub const SALES_CSV: &str = "\
id,amount,region
1,10.5,north
2,,south
3,30.0,north
4,40.0,
";

/// A local object store plus a scratch root, both removed on drop.
pub struct Harness {
    pub store_dir: TempDir,
    pub temp_root: TempDir,
    pub storage: Arc<StorageEngine>,
}

impl Harness {
    pub fn new() -> Self {
        let store_dir = tempfile::tempdir().unwrap();
        let temp_root = tempfile::tempdir().unwrap();
        let storage = Arc::new(StorageEngine::local(store_dir.path()).unwrap());
        Self {
            store_dir,
            temp_root,
            storage,
        }
    }

    /// Place an object directly in the store.
    pub fn put(&self, key: &str, body: &str) {
        let path = self.store_dir.path().join(key);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    pub fn object_path(&self, key: &str) -> PathBuf {
        self.store_dir.path().join(key)
    }

    pub fn read_json(&self, key: &str) -> serde_json::Value {
        let text = std::fs::read_to_string(self.object_path(key)).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    /// Number of job scratch directories left behind.
    pub fn scratch_dirs(&self) -> usize {
        std::fs::read_dir(self.temp_root.path()).unwrap().count()
    }

    pub fn orchestrator(&self) -> PipelineOrchestrator {
        self.orchestrator_with(ComputeConfig::default())
    }

    pub fn orchestrator_with(&self, compute: ComputeConfig) -> PipelineOrchestrator {
        PipelineOrchestrator::new(self.storage.clone(), compute, self.temp_root.path())
    }
}

pub fn request(job_id: &str, dataset: &str, job_type: &str, tasks: &[&str], scales: &[usize]) -> JobRequest {
    JobRequest::new(job_id, dataset, JobConfig::new(job_type, tasks)).with_scales(scales)
}

/// Downloads work; every upload fails.
pub struct FailingUploads(pub Arc<StorageEngine>);

#[async_trait]
impl ObjectStorage for FailingUploads {
    fn resolve_key(&self, reference: &str) -> Result<String, StorageError> {
        self.0.resolve_key(reference)
    }

    async fn download(&self, reference: &str, dest_dir: &Path) -> Result<PathBuf, StorageError> {
        self.0.download(reference, dest_dir).await
    }

    async fn upload(&self, _local_path: &Path, _folder: &str) -> Result<String, StorageError> {
        Err(StorageError::Other("bucket unavailable".into()))
    }
}
