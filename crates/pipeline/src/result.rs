//! Result-path convention and artifact persistence.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::info;

use scaleout_compute::ScaleOutput;
use scaleout_core::{PipelineError, Result};
use scaleout_storage::ObjectStorage;

use crate::performance::{write_performance_table, PerformanceRecord};

pub const PERFORMANCE_FILE: &str = "performance.csv";

/// `<namespace>/result/<job_id>/output`, where the namespace is the first
/// slash-delimited segment of the dataset key.
pub fn build_result_path(dataset_key: &str, job_id: &str) -> String {
    let namespace = dataset_key
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default();
    format!("{namespace}/result/{job_id}/output")
}

/// Key an output is reported under, e.g. `4_nodes`.
pub fn scale_key(scale: usize) -> String {
    format!("{scale}_nodes")
}

/// Summary of a finished pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub job_id: String,
    pub result_path: String,
    pub performance_metrics: Vec<PerformanceRecord>,
    pub performance_metrics_uri: String,
    /// Scale key → URI of the persisted task outputs, in scale order.
    pub outputs: IndexMap<String, String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Stages artifacts in a local directory and uploads them under the result
/// path.
pub struct ResultWriter<'a> {
    storage: &'a dyn ObjectStorage,
    result_path: &'a str,
    staging: PathBuf,
}

impl<'a> ResultWriter<'a> {
    pub fn new(storage: &'a dyn ObjectStorage, result_path: &'a str, staging: &Path) -> Result<Self> {
        std::fs::create_dir_all(staging)?;
        Ok(Self {
            storage,
            result_path,
            staging: staging.to_path_buf(),
        })
    }

    pub async fn write_performance(&self, records: &[PerformanceRecord]) -> Result<String> {
        let local = self.staging.join(PERFORMANCE_FILE);
        write_performance_table(records, &local)?;
        self.upload(&local).await
    }

    /// Persist one scale's outputs as pretty-printed JSON named
    /// `<scale>_nodes.json`.
    pub async fn write_scale_output(&self, scale: usize, output: &ScaleOutput) -> Result<String> {
        let local = self.staging.join(format!("{}.json", scale_key(scale)));
        let body = serde_json::to_vec_pretty(output)
            .map_err(|e| PipelineError::Engine(format!("cannot serialize outputs: {e}")))?;
        tokio::fs::write(&local, body).await?;
        self.upload(&local).await
    }

    async fn upload(&self, local: &Path) -> Result<String> {
        let uri = self.storage.upload(local, self.result_path).await?;
        info!(uri = %uri, "artifact persisted");
        Ok(uri)
    }
}
