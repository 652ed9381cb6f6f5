//! Job request model and the job-config validator.
//!
//! The allowed task vocabulary is a static table keyed by [`JobType`];
//! it is never mutated at runtime.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_SCALES;
use crate::error::{PipelineError, Result};

// ── Job type ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Descriptive,
    Ml,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Descriptive => "descriptive",
            JobType::Ml => "ml",
        }
    }

    /// Tasks that may be requested for this job type.
    pub fn allowed_tasks(&self) -> &'static [TaskName] {
        match self {
            JobType::Descriptive => DESCRIPTIVE_TASKS,
            JobType::Ml => ML_TASKS,
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "descriptive" => Ok(JobType::Descriptive),
            "ml" => Ok(JobType::Ml),
            other => Err(PipelineError::Validation(format!(
                "Invalid job type '{other}': expected 'descriptive' or 'ml'"
            ))),
        }
    }
}

// ── Task names ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskName {
    RowCount,
    ColumnCount,
    DataTypes,
    MinMaxMean,
    NullPercentage,
    UniqueCounts,
    Regression,
    Kmeans,
    Fpgrowth,
    Timeseries,
}

pub const DESCRIPTIVE_TASKS: &[TaskName] = &[
    TaskName::RowCount,
    TaskName::ColumnCount,
    TaskName::DataTypes,
    TaskName::MinMaxMean,
    TaskName::NullPercentage,
    TaskName::UniqueCounts,
];

pub const ML_TASKS: &[TaskName] = &[
    TaskName::Regression,
    TaskName::Kmeans,
    TaskName::Fpgrowth,
    TaskName::Timeseries,
];

impl TaskName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskName::RowCount => "row_count",
            TaskName::ColumnCount => "column_count",
            TaskName::DataTypes => "data_types",
            TaskName::MinMaxMean => "min_max_mean",
            TaskName::NullPercentage => "null_percentage",
            TaskName::UniqueCounts => "unique_counts",
            TaskName::Regression => "regression",
            TaskName::Kmeans => "kmeans",
            TaskName::Fpgrowth => "fpgrowth",
            TaskName::Timeseries => "timeseries",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        DESCRIPTIVE_TASKS
            .iter()
            .chain(ML_TASKS)
            .copied()
            .find(|t| t.as_str() == s)
    }

    pub fn job_type(&self) -> JobType {
        if DESCRIPTIVE_TASKS.contains(self) {
            JobType::Descriptive
        } else {
            JobType::Ml
        }
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Request model ─────────────────────────────────────────────

/// Job configuration as submitted: a job type and a task list, both still
/// unchecked against the task vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(rename = "type")]
    pub job_type: String,
    pub tasks: Vec<String>,
}

impl JobConfig {
    pub fn new(job_type: &str, tasks: &[&str]) -> Self {
        Self {
            job_type: job_type.to_string(),
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
        }
    }
}

fn default_scale_list() -> Vec<usize> {
    DEFAULT_SCALES.to_vec()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    pub job_id: String,
    #[serde(alias = "s3_path")]
    pub dataset_reference: String,
    pub job_config: JobConfig,
    /// Worker counts to run the job at. The first entry is the baseline.
    #[serde(default = "default_scale_list", alias = "node_list")]
    pub scale_list: Vec<usize>,
}

impl JobRequest {
    pub fn new(job_id: &str, dataset_reference: &str, job_config: JobConfig) -> Self {
        Self {
            job_id: job_id.to_string(),
            dataset_reference: dataset_reference.to_string(),
            job_config,
            scale_list: default_scale_list(),
        }
    }

    pub fn with_scales(mut self, scales: &[usize]) -> Self {
        self.scale_list = scales.to_vec();
        self
    }

    /// Check identity fields, the scale list and the job config.
    pub fn validate(&self, max_workers: usize) -> Result<ValidatedJob> {
        if self.job_id.trim().is_empty() {
            return Err(PipelineError::Validation(
                "job_id must be a non-empty string".into(),
            ));
        }
        if self.dataset_reference.trim().is_empty() {
            return Err(PipelineError::Validation(
                "dataset_reference must be a non-empty string".into(),
            ));
        }
        validate_scale_list(&self.scale_list, max_workers)?;
        JobConfigValidator::validate(&self.job_config)
    }
}

/// A job config whose type and tasks have been checked against the
/// allowed-task table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedJob {
    pub job_type: JobType,
    pub tasks: Vec<TaskName>,
}

// ── Validation ────────────────────────────────────────────────

pub struct JobConfigValidator;

impl JobConfigValidator {
    /// Validate the job type and every requested task.
    ///
    /// Duplicate task names are collapsed, keeping first-occurrence order.
    pub fn validate(config: &JobConfig) -> Result<ValidatedJob> {
        let job_type: JobType = config.job_type.parse()?;

        if config.tasks.is_empty() {
            return Err(PipelineError::Validation(
                "Tasks must be a non-empty list".into(),
            ));
        }

        let allowed = job_type.allowed_tasks();
        let mut invalid = Vec::new();
        let mut tasks = Vec::with_capacity(config.tasks.len());

        for raw in &config.tasks {
            match TaskName::parse(raw).filter(|t| allowed.contains(t)) {
                Some(task) if !tasks.contains(&task) => tasks.push(task),
                Some(_) => {}
                None => invalid.push(raw.as_str()),
            }
        }

        if !invalid.is_empty() {
            return Err(PipelineError::Validation(format!(
                "Invalid tasks for job type '{}': [{}]",
                job_type,
                invalid.join(", ")
            )));
        }

        Ok(ValidatedJob { job_type, tasks })
    }
}

/// Scales must be non-empty, positive, unique and within `max_workers`.
pub fn validate_scale_list(scales: &[usize], max_workers: usize) -> Result<()> {
    if scales.is_empty() {
        return Err(PipelineError::Validation(
            "scale_list must be a non-empty list".into(),
        ));
    }

    let mut seen = HashSet::with_capacity(scales.len());
    for &scale in scales {
        if scale == 0 {
            return Err(PipelineError::Validation(
                "scale_list entries must be positive integers".into(),
            ));
        }
        if scale > max_workers {
            return Err(PipelineError::Validation(format!(
                "scale {scale} exceeds the maximum of {max_workers} workers"
            )));
        }
        if !seen.insert(scale) {
            return Err(PipelineError::Validation(format!(
                "scale {scale} appears more than once in scale_list"
            )));
        }
    }
    Ok(())
}
