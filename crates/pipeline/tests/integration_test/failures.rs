use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scaleout_compute::{AnalyticsTask, ComputeError, Dataset, TaskOutcome, TaskRegistry};
use scaleout_core::config::ComputeConfig;
use scaleout_core::{PipelineError, TaskName};
use scaleout_pipeline::PipelineOrchestrator;

use crate::helpers::{request, FailingUploads, Harness, SALES_CSV};

/// Row count that records the session size it ran in and fails at one scale.
struct RecordingRowCount {
    fail_at: Option<usize>,
    seen: Arc<Mutex<Vec<usize>>>,
}

impl AnalyticsTask for RecordingRowCount {
    fn name(&self) -> TaskName {
        TaskName::RowCount
    }

    fn run(&self, dataset: &Dataset) -> Result<TaskOutcome, ComputeError> {
        let workers = rayon::current_num_threads();
        self.seen.lock().unwrap().push(workers);
        if self.fail_at == Some(workers) {
            return Err(ComputeError::failed("row_count", "injected failure"));
        }
        TaskOutcome::value(dataset.row_count())
    }
}

fn recording_orchestrator(h: &Harness, fail_at: Option<usize>) -> (PipelineOrchestrator, Arc<Mutex<Vec<usize>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut registry = TaskRegistry::standard();
    registry.register(Arc::new(RecordingRowCount {
        fail_at,
        seen: seen.clone(),
    }));
    (h.orchestrator().with_registry(registry), seen)
}

/// Row count that reports each scale it starts and then waits to be released.
struct GatedRowCount {
    started: Mutex<Sender<usize>>,
    release: Mutex<Receiver<()>>,
}

impl AnalyticsTask for GatedRowCount {
    fn name(&self) -> TaskName {
        TaskName::RowCount
    }

    fn run(&self, dataset: &Dataset) -> Result<TaskOutcome, ComputeError> {
        let _ = self.started.lock().unwrap().send(rayon::current_num_threads());
        let _ = self.release.lock().unwrap().recv();
        TaskOutcome::value(dataset.row_count())
    }
}

#[tokio::test]
async fn sessions_are_sized_to_each_scale_in_order() {
    let h = Harness::new();
    h.put("acme/datasets/sales.csv", SALES_CSV);
    let (orchestrator, seen) = recording_orchestrator(&h, None);

    let req = request("sized", "acme/datasets/sales.csv", "descriptive", &["row_count"], &[3, 1, 2]);
    let result = orchestrator.execute(req).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![3, 1, 2]);
    assert_eq!(result.performance_metrics[0].scale, 3);
    assert_eq!(result.performance_metrics[0].speedup, 1.0);
    assert_eq!(orchestrator.active_sessions(), 0);
}

#[tokio::test]
async fn failing_scale_aborts_remaining_scales() {
    let h = Harness::new();
    h.put("acme/datasets/sales.csv", SALES_CSV);
    let (orchestrator, seen) = recording_orchestrator(&h, Some(2));

    let req = request("abort", "acme/datasets/sales.csv", "descriptive", &["row_count"], &[1, 2, 4]);
    let err = orchestrator.execute(req).await.unwrap_err();

    assert!(matches!(err, PipelineError::Engine(ref m) if m.contains("injected failure")), "{err:?}");
    assert_eq!(*seen.lock().unwrap(), vec![1, 2], "scale 4 must not run");
    assert_eq!(orchestrator.active_sessions(), 0, "failed scale must release its session");
    assert!(!h.object_path("acme/result/abort").exists(), "nothing is persisted");
    assert_eq!(h.scratch_dirs(), 0);
}

#[tokio::test]
async fn invalid_task_is_rejected_before_download() {
    let h = Harness::new();
    // The dataset does not exist: validation must fail first.
    let req = request("bad", "acme/datasets/missing.csv", "ml", &["kmeans", "row_count"], &[1]);
    let err = h.orchestrator().execute(req).await.unwrap_err();

    assert!(err.is_client_error());
    match err {
        PipelineError::Validation(msg) => assert!(msg.contains("row_count"), "{msg}"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_job_type_is_rejected() {
    let h = Harness::new();
    let req = request("bad-type", "acme/datasets/sales.csv", "streaming", &["row_count"], &[1]);
    let err = h.orchestrator().execute(req).await.unwrap_err();
    assert!(matches!(err, PipelineError::Validation(_)));
}

#[tokio::test]
async fn scale_list_is_validated() {
    let h = Harness::new();
    h.put("acme/datasets/sales.csv", SALES_CSV);
    let orchestrator = h.orchestrator_with(ComputeConfig {
        max_workers: 4,
        ..ComputeConfig::default()
    });

    for scales in [&[][..], &[0], &[1, 1], &[8]] {
        let req = request("scales", "acme/datasets/sales.csv", "descriptive", &["row_count"], scales);
        let err = orchestrator.execute(req).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)), "{scales:?}: {err:?}");
    }
    assert_eq!(h.scratch_dirs(), 0);
}

#[tokio::test]
async fn missing_dataset_is_not_found() {
    let h = Harness::new();
    let req = request("missing", "acme/datasets/absent.csv", "descriptive", &["row_count"], &[1]);
    let err = h.orchestrator().execute(req).await.unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(_)), "{err:?}");
    assert_eq!(h.scratch_dirs(), 0);
}

#[tokio::test]
async fn unsupported_extension_is_rejected() {
    let h = Harness::new();
    h.put("acme/datasets/data.parquet", "PAR1");
    let req = request("parquet", "acme/datasets/data.parquet", "descriptive", &["row_count"], &[1]);
    let err = h.orchestrator().execute(req).await.unwrap_err();
    assert!(matches!(err, PipelineError::UnsupportedFormat(ref ext) if ext == "parquet"), "{err:?}");
}

#[tokio::test]
async fn upload_failure_surfaces_as_storage_error() {
    let h = Harness::new();
    h.put("acme/datasets/sales.csv", SALES_CSV);
    let storage = Arc::new(FailingUploads(h.storage.clone()));
    let orchestrator = PipelineOrchestrator::new(storage, ComputeConfig::default(), h.temp_root.path());

    let req = request("upload", "acme/datasets/sales.csv", "descriptive", &["row_count"], &[1]);
    let err = orchestrator.execute(req).await.unwrap_err();
    assert!(matches!(err, PipelineError::Storage(ref m) if m.contains("bucket unavailable")), "{err:?}");
    assert!(!err.is_client_error());
    assert_eq!(h.scratch_dirs(), 0);
}

#[tokio::test]
async fn dropped_request_stops_after_current_scale() {
    let h = Harness::new();
    h.put("acme/datasets/sales.csv", SALES_CSV);
    let (started_tx, started_rx) = channel();
    let (release_tx, release_rx) = channel();
    let mut registry = TaskRegistry::standard();
    registry.register(Arc::new(GatedRowCount {
        started: Mutex::new(started_tx),
        release: Mutex::new(release_rx),
    }));
    let orchestrator = h.orchestrator().with_registry(registry);

    let req = request("dropped", "acme/datasets/sales.csv", "descriptive", &["row_count"], &[1, 2]);
    let first_scale = tokio::select! {
        result = orchestrator.execute(req) => panic!("job finished while gated: {result:?}"),
        scale = tokio::task::spawn_blocking(move || started_rx.recv().map(|s| (s, started_rx))) => scale,
    };
    let (scale, started_rx) = first_scale.unwrap().unwrap();
    assert_eq!(scale, 1);

    // The request future is gone; the running scale still has its input.
    assert_eq!(h.scratch_dirs(), 1);
    release_tx.send(()).unwrap();
    drop(release_tx);

    for _ in 0..200 {
        if h.scratch_dirs() == 0 && orchestrator.active_sessions() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert_eq!(h.scratch_dirs(), 0, "scratch dir is removed once the loop ends");
    assert_eq!(orchestrator.active_sessions(), 0);
    assert!(started_rx.try_recv().is_err(), "scale 2 must not start");
    assert!(!h.object_path("acme/result/dropped").exists());
}
