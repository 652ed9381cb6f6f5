//! The per-scale execution loop.
//!
//! One orchestrator runs one job at a time: it owns its compute engine, and
//! the engine refuses a second live session.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use indexmap::IndexMap;
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

use scaleout_compute::{engine_for, ComputeEngine, ScaleOutput, TaskRegistry};
use scaleout_core::config::ComputeConfig;
use scaleout_core::{DatasetDescriptor, DatasetResolver, JobRequest, PipelineError, Result, ValidatedJob};
use scaleout_storage::ObjectStorage;

use crate::performance::PerformanceAnalyzer;
use crate::result::{build_result_path, scale_key, PipelineResult, ResultWriter};

/// Outcome of one scale iteration.
#[derive(Debug)]
pub struct ScaleRun {
    pub scale: usize,
    pub output: ScaleOutput,
    pub duration_seconds: f64,
}

pub struct PipelineOrchestrator {
    storage: Arc<dyn ObjectStorage>,
    engine: Arc<ComputeEngine>,
    registry: Arc<TaskRegistry>,
    compute: ComputeConfig,
    temp_root: PathBuf,
}

impl PipelineOrchestrator {
    /// Scratch directories are created under `temp_root`, one per job.
    pub fn new(storage: Arc<dyn ObjectStorage>, compute: ComputeConfig, temp_root: &Path) -> Self {
        Self {
            storage,
            engine: Arc::new(ComputeEngine::new(compute.max_workers)),
            registry: Arc::new(TaskRegistry::standard()),
            compute,
            temp_root: temp_root.to_path_buf(),
        }
    }

    /// Replace the task handlers used for dispatch.
    pub fn with_registry(mut self, registry: TaskRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Sessions currently alive on this orchestrator's engine.
    pub fn active_sessions(&self) -> usize {
        self.engine.active_sessions()
    }

    pub async fn execute(&self, request: JobRequest) -> Result<PipelineResult> {
        let started_at = Utc::now();
        info!(
            job_id = %request.job_id,
            dataset = %request.dataset_reference,
            scales = ?request.scale_list,
            "pipeline started"
        );

        let result = self.run_job(&request, started_at).await;
        match &result {
            Ok(r) => info!(
                job_id = %r.job_id,
                result_path = %r.result_path,
                "pipeline completed"
            ),
            Err(e) => error!(job_id = %request.job_id, kind = e.kind(), error = %e, "pipeline failed"),
        }
        result
    }

    async fn run_job(
        &self,
        request: &JobRequest,
        started_at: chrono::DateTime<Utc>,
    ) -> Result<PipelineResult> {
        // Everything that can be rejected is rejected before a session exists.
        let job = request.validate(self.compute.max_workers)?;
        self.registry.check(&job)?;
        let dataset_key = self.storage.resolve_key(&request.dataset_reference)?;
        let result_path = build_result_path(&dataset_key, &request.job_id);

        std::fs::create_dir_all(&self.temp_root)?;
        let scratch = tempfile::Builder::new()
            .prefix(&format!("{}-", scratch_prefix(&request.job_id)))
            .tempdir_in(&self.temp_root)?;

        let local = self
            .storage
            .download(&request.dataset_reference, &scratch.path().join("input"))
            .await?;
        let descriptor = DatasetResolver::resolve(&local)?;
        info!(
            job_id = %request.job_id,
            job_type = %job.job_type,
            tasks = job.tasks.len(),
            format = %descriptor.extension,
            "job validated"
        );

        let (scratch, runs) = self
            .run_scales(scratch, local, descriptor, job, request.scale_list.clone())
            .await?;

        let timings: Vec<(usize, f64)> = runs.iter().map(|r| (r.scale, r.duration_seconds)).collect();
        let performance_metrics = PerformanceAnalyzer::analyze(&timings)?;

        let writer = ResultWriter::new(
            self.storage.as_ref(),
            &result_path,
            &scratch.path().join("output"),
        )?;
        let performance_metrics_uri = writer.write_performance(&performance_metrics).await?;
        let mut outputs = IndexMap::with_capacity(runs.len());
        for run in &runs {
            let uri = writer.write_scale_output(run.scale, &run.output).await?;
            outputs.insert(scale_key(run.scale), uri);
        }

        Ok(PipelineResult {
            job_id: request.job_id.clone(),
            result_path,
            performance_metrics,
            performance_metrics_uri,
            outputs,
            started_at,
            completed_at: Utc::now(),
        })
    }

    /// Run every scale in order on a blocking thread. The first failure
    /// stops the loop; the failing scale's session is released on the way
    /// out like every other.
    ///
    /// The blocking thread owns `scratch` until it hands it back, so the
    /// dataset under it outlives the loop even when this future is dropped.
    /// Dropping the future also stops the loop before its next scale.
    async fn run_scales(
        &self,
        scratch: TempDir,
        path: PathBuf,
        descriptor: DatasetDescriptor,
        job: ValidatedJob,
        scales: Vec<usize>,
    ) -> Result<(TempDir, Vec<ScaleRun>)> {
        let engine = Arc::clone(&self.engine);
        let registry = Arc::clone(&self.registry);
        let cancelled = Arc::new(AtomicBool::new(false));
        let _cancel_on_drop = CancelOnDrop(Arc::clone(&cancelled));

        tokio::task::spawn_blocking(move || {
            let tasks = engine_for(job.job_type, registry);
            let runs = scales
                .into_iter()
                .map(|scale| -> Result<ScaleRun> {
                    if cancelled.load(Ordering::Acquire) {
                        warn!(scale, "caller went away, remaining scales skipped");
                        return Err(PipelineError::Engine(format!(
                            "job abandoned before scale {scale}"
                        )));
                    }
                    let session = engine.create_session(scale)?;
                    let dataset = session.load(&path, &descriptor)?;
                    let rows = dataset.row_count();
                    debug!(scale, rows, session_id = %session.id(), "dataset materialized");

                    let started = Instant::now();
                    let output = session.run(|| tasks.run(&dataset, &job.tasks))?;
                    let duration_seconds = started.elapsed().as_secs_f64();
                    info!(scale, duration_secs = duration_seconds, "scale finished");

                    Ok(ScaleRun {
                        scale,
                        output,
                        duration_seconds,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok((scratch, runs))
        })
        .await
        .map_err(|e| PipelineError::Engine(format!("compute worker aborted: {e}")))?
    }
}

/// Flags the blocking scale loop to stop once the awaiting future is gone.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Job ids become part of a directory name.
fn scratch_prefix(job_id: &str) -> String {
    job_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
