//! Compute engine and sized sessions.
//!
//! A [`ComputeSession`] owns a dedicated rayon pool with exactly `workers`
//! threads. Dropping the session releases the pool, so every exit path of
//! the code holding it (success, task error, panic unwinding) releases it.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use scaleout_core::DatasetDescriptor;

use crate::dataset::Dataset;
use crate::error::ComputeError;
use crate::loader;

/// Hands out compute sessions. At most one session per engine is alive at a
/// time; each pipeline invocation owns its own engine.
pub struct ComputeEngine {
    max_workers: usize,
    active: Arc<AtomicUsize>,
}

impl Default for ComputeEngine {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ComputeEngine {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of sessions currently alive (0 or 1).
    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Create a session sized to `workers` threads.
    pub fn create_session(&self, workers: usize) -> Result<ComputeSession, ComputeError> {
        if workers == 0 || workers > self.max_workers {
            return Err(ComputeError::Session(format!(
                "worker count {} outside 1..={}",
                workers, self.max_workers
            )));
        }

        if self
            .active
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ComputeError::Session(
                "another session is still active on this engine".into(),
            ));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(move |i| format!("scale{}-worker-{}", workers, i))
            .build();

        let pool = match pool {
            Ok(pool) => pool,
            Err(e) => {
                self.active.store(0, Ordering::SeqCst);
                return Err(ComputeError::Session(format!(
                    "failed to build thread pool: {e}"
                )));
            }
        };

        let id = Uuid::new_v4();
        info!(session_id = %id, workers, "compute session acquired");

        Ok(ComputeSession {
            id,
            workers,
            pool,
            active: Arc::clone(&self.active),
        })
    }
}

pub struct ComputeSession {
    id: Uuid,
    workers: usize,
    pool: rayon::ThreadPool,
    active: Arc<AtomicUsize>,
}

impl ComputeSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Load and fully materialize a dataset inside this session.
    pub fn load(&self, path: &Path, descriptor: &DatasetDescriptor) -> Result<Dataset, ComputeError> {
        debug!(
            session_id = %self.id,
            path = %path.display(),
            format = %descriptor.extension,
            "loading dataset"
        );
        self.pool.install(|| loader::load(path, descriptor))
    }

    /// Run `op` on this session's worker pool. Parallel iterators used inside
    /// `op` are bounded by the session's worker count.
    pub fn run<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}

impl Drop for ComputeSession {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        info!(session_id = %self.id, workers = self.workers, "compute session released");
    }
}
