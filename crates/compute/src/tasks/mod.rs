//! Task handlers and the engines that dispatch to them.
//!
//! Each task name maps to one [`AnalyticsTask`] in a [`TaskRegistry`]. The
//! registry is checked against a validated job before any session is
//! created, so dispatch itself never meets an unknown task.

pub mod descriptive;
pub mod ml;

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use scaleout_core::{JobType, PipelineError, TaskName, ValidatedJob};

use crate::dataset::Dataset;
use crate::error::ComputeError;

pub use descriptive::DescriptiveStatsEngine;
pub use ml::MlTaskEngine;

/// Message reported for a dataset with no rows.
pub const EMPTY_DATASET: &str = "Empty dataset";

/// What one task produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TaskOutcome {
    Value(serde_json::Value),
    /// The task did not apply to this dataset; carries the reason.
    Skipped(String),
}

impl TaskOutcome {
    pub fn value(value: impl Serialize) -> Result<Self, ComputeError> {
        serde_json::to_value(value)
            .map(TaskOutcome::Value)
            .map_err(|e| ComputeError::failed("serialize", e.to_string()))
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        TaskOutcome::Skipped(reason.into())
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, TaskOutcome::Skipped(_))
    }
}

/// Output of one engine run at one scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScaleOutput {
    /// The dataset was rejected as a whole, e.g. `{"error": "Empty dataset"}`.
    Error { error: String },
    /// Task name → outcome, in request order.
    Tasks(IndexMap<String, TaskOutcome>),
}

impl ScaleOutput {
    pub fn empty_dataset() -> Self {
        ScaleOutput::Error {
            error: EMPTY_DATASET.to_string(),
        }
    }
}

/// One named analytics task over a loaded dataset.
///
/// Handlers run inside the session's pool, so rayon parallel iterators used
/// here are bounded by the session's worker count.
pub trait AnalyticsTask: Send + Sync {
    fn name(&self) -> TaskName;

    fn run(&self, dataset: &Dataset) -> Result<TaskOutcome, ComputeError>;
}

/// Task name → handler.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    handlers: HashMap<TaskName, Arc<dyn AnalyticsTask>>,
}

impl TaskRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every built-in descriptive and ML task.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        descriptive::register(&mut registry);
        ml::register(&mut registry);
        registry
    }

    /// Register a handler, replacing any previous one for the same name.
    pub fn register(&mut self, task: Arc<dyn AnalyticsTask>) -> &mut Self {
        self.handlers.insert(task.name(), task);
        self
    }

    pub fn get(&self, name: TaskName) -> Option<&Arc<dyn AnalyticsTask>> {
        self.handlers.get(&name)
    }

    /// Ensure every task of `job` has a handler.
    pub fn check(&self, job: &ValidatedJob) -> Result<(), PipelineError> {
        let missing: Vec<&str> = job
            .tasks
            .iter()
            .filter(|t| !self.handlers.contains_key(*t))
            .map(TaskName::as_str)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Validation(format!(
                "No handler registered for tasks: [{}]",
                missing.join(", ")
            )))
        }
    }
}

/// Runs a job's tasks over one dataset.
pub trait TaskEngine: Send + Sync {
    fn run(&self, dataset: &Dataset, tasks: &[TaskName]) -> Result<ScaleOutput, ComputeError>;
}

/// The engine responsible for `job_type`, dispatching through `registry`.
pub fn engine_for(job_type: JobType, registry: Arc<TaskRegistry>) -> Box<dyn TaskEngine> {
    match job_type {
        JobType::Descriptive => Box::new(DescriptiveStatsEngine::new(registry)),
        JobType::Ml => Box::new(MlTaskEngine::new(registry)),
    }
}

/// Shared dispatch loop: empty datasets short-circuit, otherwise each task
/// runs in request order and the first failure aborts the rest.
fn dispatch(
    registry: &TaskRegistry,
    dataset: &Dataset,
    tasks: &[TaskName],
) -> Result<ScaleOutput, ComputeError> {
    if dataset.row_count() == 0 {
        return Ok(ScaleOutput::empty_dataset());
    }

    let mut outputs = IndexMap::with_capacity(tasks.len());
    for &name in tasks {
        let handler = registry
            .get(name)
            .ok_or_else(|| ComputeError::failed(name.as_str(), "no handler registered"))?;
        let outcome = handler.run(dataset)?;
        debug!(task = %name, skipped = outcome.is_skipped(), "task finished");
        outputs.insert(name.as_str().to_string(), outcome);
    }
    Ok(ScaleOutput::Tasks(outputs))
}
