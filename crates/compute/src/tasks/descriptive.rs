//! Descriptive statistics tasks.
//!
//! Per-column aggregations fan out over columns with rayon; results keep
//! schema order.

use std::sync::Arc;

use indexmap::IndexMap;
use rayon::prelude::*;

use scaleout_core::TaskName;

use super::{dispatch, AnalyticsTask, ScaleOutput, TaskEngine, TaskOutcome, TaskRegistry};
use crate::dataset::{round_to, ColumnSummary, Dataset};
use crate::error::ComputeError;

/// Declared types that `min_max_mean` aggregates.
pub const NUMERIC_TYPES: &[&str] = &["int", "long", "float", "double"];

pub(super) fn register(registry: &mut TaskRegistry) {
    registry
        .register(Arc::new(RowCountTask))
        .register(Arc::new(ColumnCountTask))
        .register(Arc::new(DataTypesTask))
        .register(Arc::new(MinMaxMeanTask))
        .register(Arc::new(NullPercentageTask))
        .register(Arc::new(UniqueCountsTask));
}

/// Apply `f` to every column in `columns` in parallel, keeping input order.
fn per_column<T, F>(columns: &[String], f: F) -> Result<IndexMap<String, T>, ComputeError>
where
    T: Send,
    F: Fn(&str) -> Result<T, ComputeError> + Sync,
{
    let values = columns
        .par_iter()
        .map(|c| f(c.as_str()).map(|v| (c.clone(), v)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(values.into_iter().collect())
}

pub struct RowCountTask;

impl AnalyticsTask for RowCountTask {
    fn name(&self) -> TaskName {
        TaskName::RowCount
    }

    fn run(&self, dataset: &Dataset) -> Result<TaskOutcome, ComputeError> {
        TaskOutcome::value(dataset.row_count())
    }
}

pub struct ColumnCountTask;

impl AnalyticsTask for ColumnCountTask {
    fn name(&self) -> TaskName {
        TaskName::ColumnCount
    }

    fn run(&self, dataset: &Dataset) -> Result<TaskOutcome, ComputeError> {
        TaskOutcome::value(dataset.column_count())
    }
}

pub struct DataTypesTask;

impl AnalyticsTask for DataTypesTask {
    fn name(&self) -> TaskName {
        TaskName::DataTypes
    }

    fn run(&self, dataset: &Dataset) -> Result<TaskOutcome, ComputeError> {
        TaskOutcome::value(dataset.declared_types())
    }
}

/// Min, max and mean of every numeric column. An empty object when the
/// dataset has no numeric columns.
pub struct MinMaxMeanTask;

impl AnalyticsTask for MinMaxMeanTask {
    fn name(&self) -> TaskName {
        TaskName::MinMaxMean
    }

    fn run(&self, dataset: &Dataset) -> Result<TaskOutcome, ComputeError> {
        let numeric = dataset.columns_of_types(NUMERIC_TYPES);
        let summaries: IndexMap<String, ColumnSummary> =
            per_column(&numeric, |c| dataset.summarize(c))?;
        TaskOutcome::value(summaries)
    }
}

/// Percentage of missing values per column, 0–100 rounded to 2 decimals.
pub struct NullPercentageTask;

impl AnalyticsTask for NullPercentageTask {
    fn name(&self) -> TaskName {
        TaskName::NullPercentage
    }

    fn run(&self, dataset: &Dataset) -> Result<TaskOutcome, ComputeError> {
        let rows = dataset.row_count();
        if rows == 0 {
            return Err(ComputeError::failed(self.name().as_str(), "dataset has no rows"));
        }
        let percentages = per_column(&dataset.column_names(), |c| {
            let missing = dataset.missing_count(c)?;
            Ok(round_to(missing as f64 / rows as f64 * 100.0, 2))
        })?;
        TaskOutcome::value(percentages)
    }
}

pub struct UniqueCountsTask;

impl AnalyticsTask for UniqueCountsTask {
    fn name(&self) -> TaskName {
        TaskName::UniqueCounts
    }

    fn run(&self, dataset: &Dataset) -> Result<TaskOutcome, ComputeError> {
        let counts = per_column(&dataset.column_names(), |c| dataset.distinct_count(c))?;
        TaskOutcome::value(counts)
    }
}

pub struct DescriptiveStatsEngine {
    registry: Arc<TaskRegistry>,
}

impl DescriptiveStatsEngine {
    pub fn new(registry: Arc<TaskRegistry>) -> Self {
        Self { registry }
    }
}

impl Default for DescriptiveStatsEngine {
    fn default() -> Self {
        Self::new(Arc::new(TaskRegistry::standard()))
    }
}

impl TaskEngine for DescriptiveStatsEngine {
    fn run(&self, dataset: &Dataset, tasks: &[TaskName]) -> Result<ScaleOutput, ComputeError> {
        dispatch(&self.registry, dataset, tasks)
    }
}
