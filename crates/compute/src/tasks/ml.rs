//! Machine-learning tasks: clustering, regression, frequent itemsets and
//! per-day event counts.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;

use scaleout_core::TaskName;

use super::{dispatch, AnalyticsTask, ScaleOutput, TaskEngine, TaskOutcome, TaskRegistry};
use crate::algorithms::fpgrowth::{frequent_itemsets, FpGrowthParams};
use crate::algorithms::kmeans::{kmeans, KmeansParams};
use crate::algorithms::regression::fit_linear;
use crate::dataset::Dataset;
use crate::error::ComputeError;

/// Declared types usable as model features.
pub const FEATURE_TYPES: &[&str] = &["int", "float", "double"];

pub const SKIP_NO_NUMERIC: &str = "Skipped: no numeric columns";
pub const SKIP_INSUFFICIENT_COLUMNS: &str = "Skipped: insufficient columns";
pub const SKIP_NO_COMPLETE_ROWS: &str = "Skipped: no complete numeric rows";
pub const SKIP_NO_ITEMS: &str = "Skipped: items column required";
pub const SKIP_NO_TIMESTAMP: &str = "Skipped: timestamp column required";

const ITEMS_COLUMN: &str = "items";
const TIMESTAMP_COLUMN: &str = "timestamp";

pub(super) fn register(registry: &mut TaskRegistry) {
    registry
        .register(Arc::new(KmeansTask::default()))
        .register(Arc::new(RegressionTask))
        .register(Arc::new(FpGrowthTask::default()))
        .register(Arc::new(TimeseriesTask));
}

/// Fits k-means over every feature column and reports the cluster centers.
#[derive(Default)]
pub struct KmeansTask {
    params: KmeansParams,
}

impl AnalyticsTask for KmeansTask {
    fn name(&self) -> TaskName {
        TaskName::Kmeans
    }

    fn run(&self, dataset: &Dataset) -> Result<TaskOutcome, ComputeError> {
        let features = dataset.columns_of_types(FEATURE_TYPES);
        if features.is_empty() {
            return Ok(TaskOutcome::skipped(SKIP_NO_NUMERIC));
        }

        let points = dataset.feature_rows(&features)?;
        match kmeans(&points, self.params) {
            Some(result) => TaskOutcome::value(result.centroids),
            None => Ok(TaskOutcome::skipped(SKIP_NO_COMPLETE_ROWS)),
        }
    }
}

/// Linear regression of the last feature column on all the others. Reports
/// the coefficient vector, intercept excluded.
pub struct RegressionTask;

impl AnalyticsTask for RegressionTask {
    fn name(&self) -> TaskName {
        TaskName::Regression
    }

    fn run(&self, dataset: &Dataset) -> Result<TaskOutcome, ComputeError> {
        let columns = dataset.columns_of_types(FEATURE_TYPES);
        if columns.len() < 2 {
            return Ok(TaskOutcome::skipped(SKIP_INSUFFICIENT_COLUMNS));
        }

        let rows = dataset.feature_rows(&columns)?;
        if rows.is_empty() {
            return Ok(TaskOutcome::skipped(SKIP_NO_COMPLETE_ROWS));
        }

        let model = fit_linear(&rows).ok_or_else(|| {
            ComputeError::failed(self.name().as_str(), "least-squares fit has no finite solution")
        })?;
        TaskOutcome::value(model.coefficients)
    }
}

#[derive(Default)]
pub struct FpGrowthTask {
    params: FpGrowthParams,
}

impl AnalyticsTask for FpGrowthTask {
    fn name(&self) -> TaskName {
        TaskName::Fpgrowth
    }

    fn run(&self, dataset: &Dataset) -> Result<TaskOutcome, ComputeError> {
        if !dataset.has_column(ITEMS_COLUMN) {
            return Ok(TaskOutcome::skipped(SKIP_NO_ITEMS));
        }
        let Some(transactions) = dataset.transactions(ITEMS_COLUMN)? else {
            return Ok(TaskOutcome::skipped(SKIP_NO_ITEMS));
        };
        TaskOutcome::value(frequent_itemsets(&transactions, &self.params))
    }
}

#[derive(Debug, PartialEq, Serialize)]
pub struct DateCount {
    pub date: Option<NaiveDate>,
    pub count: usize,
}

/// Row count per calendar day of the `timestamp` column, ascending, with
/// unreadable dates last.
pub struct TimeseriesTask;

impl AnalyticsTask for TimeseriesTask {
    fn name(&self) -> TaskName {
        TaskName::Timeseries
    }

    fn run(&self, dataset: &Dataset) -> Result<TaskOutcome, ComputeError> {
        if !dataset.has_column(TIMESTAMP_COLUMN) {
            return Ok(TaskOutcome::skipped(SKIP_NO_TIMESTAMP));
        }

        let dates = dataset.dates(TIMESTAMP_COLUMN)?;
        let counts = dates
            .par_iter()
            .fold(HashMap::new, |mut acc: HashMap<Option<NaiveDate>, usize>, d| {
                *acc.entry(*d).or_default() += 1;
                acc
            })
            .reduce(HashMap::new, |mut a, b| {
                for (k, v) in b {
                    *a.entry(k).or_default() += v;
                }
                a
            });

        let mut undated = None;
        let mut by_day = BTreeMap::new();
        for (date, count) in counts {
            match date {
                Some(d) => {
                    by_day.insert(d, count);
                }
                None => undated = Some(count),
            }
        }

        let series: Vec<DateCount> = by_day
            .into_iter()
            .map(|(d, count)| DateCount {
                date: Some(d),
                count,
            })
            .chain(undated.map(|count| DateCount { date: None, count }))
            .collect();
        TaskOutcome::value(series)
    }
}

pub struct MlTaskEngine {
    registry: Arc<TaskRegistry>,
}

impl MlTaskEngine {
    pub fn new(registry: Arc<TaskRegistry>) -> Self {
        Self { registry }
    }
}

impl Default for MlTaskEngine {
    fn default() -> Self {
        Self::new(Arc::new(TaskRegistry::standard()))
    }
}

impl TaskEngine for MlTaskEngine {
    fn run(&self, dataset: &Dataset, tasks: &[TaskName]) -> Result<ScaleOutput, ComputeError> {
        dispatch(&self.registry, dataset, tasks)
    }
}
