//! Speedup and efficiency relative to the first scale, plus the on-disk
//! performance table.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, AsArray, Float64Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Float64Type, Schema, SchemaRef, UInt64Type};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use tracing::info;

use scaleout_compute::dataset::round_to;
use scaleout_core::{PipelineError, Result};

/// Header of the persisted performance table.
pub const PERFORMANCE_COLUMNS: [&str; 4] = ["scale", "duration_seconds", "speedup", "efficiency"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub scale: usize,
    pub duration_seconds: f64,
    pub speedup: f64,
    pub efficiency: f64,
}

pub struct PerformanceAnalyzer;

impl PerformanceAnalyzer {
    /// Derive one record per `(scale, duration_seconds)` pair, in order.
    ///
    /// The first pair is the baseline. `speedup = round(baseline / duration, 2)`
    /// and `efficiency = round(speedup / scale, 2)`. Any non-positive duration
    /// fails rather than producing an infinite ratio.
    pub fn analyze(timings: &[(usize, f64)]) -> Result<Vec<PerformanceRecord>> {
        let Some(&(baseline_scale, baseline)) = timings.first() else {
            return Err(PipelineError::Performance(
                "no scale timings to analyze".into(),
            ));
        };
        if !(baseline > 0.0) {
            return Err(PipelineError::Performance(format!(
                "baseline duration at scale {baseline_scale} is {baseline}s; speedup is undefined"
            )));
        }

        let records = timings
            .iter()
            .map(|&(scale, duration)| {
                if !(duration > 0.0) {
                    return Err(PipelineError::Performance(format!(
                        "duration at scale {scale} is {duration}s; speedup is undefined"
                    )));
                }
                let speedup = round_to(baseline / duration, 2);
                let efficiency = round_to(speedup / scale as f64, 2);
                Ok(PerformanceRecord {
                    scale,
                    duration_seconds: round_to(duration, 6),
                    speedup,
                    efficiency,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        for r in &records {
            info!(
                scale = r.scale,
                duration_secs = r.duration_seconds,
                speedup = r.speedup,
                efficiency = r.efficiency,
                "scale metrics"
            );
        }
        Ok(records)
    }
}

fn table_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(PERFORMANCE_COLUMNS[0], DataType::UInt64, false),
        Field::new(PERFORMANCE_COLUMNS[1], DataType::Float64, false),
        Field::new(PERFORMANCE_COLUMNS[2], DataType::Float64, false),
        Field::new(PERFORMANCE_COLUMNS[3], DataType::Float64, false),
    ]))
}

fn table_error(err: ArrowError) -> PipelineError {
    PipelineError::Io(std::io::Error::other(err))
}

/// Write `records` as delimited text with a header row.
pub fn write_performance_table(records: &[PerformanceRecord], path: &Path) -> Result<()> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from_iter_values(records.iter().map(|r| r.scale as u64))),
        Arc::new(Float64Array::from_iter_values(records.iter().map(|r| r.duration_seconds))),
        Arc::new(Float64Array::from_iter_values(records.iter().map(|r| r.speedup))),
        Arc::new(Float64Array::from_iter_values(records.iter().map(|r| r.efficiency))),
    ];
    let batch = RecordBatch::try_new(table_schema(), columns).map_err(table_error)?;

    let mut writer = arrow::csv::Writer::new(File::create(path)?);
    writer.write(&batch).map_err(table_error)?;
    Ok(())
}

/// Read a table written by [`write_performance_table`].
pub fn read_performance_table(path: &Path) -> Result<Vec<PerformanceRecord>> {
    let reader = arrow::csv::ReaderBuilder::new(table_schema())
        .with_header(true)
        .build(File::open(path)?)
        .map_err(table_error)?;

    let mut records = Vec::new();
    for batch in reader {
        let batch = batch.map_err(table_error)?;
        let scale = batch.column(0).as_primitive::<UInt64Type>();
        let duration = batch.column(1).as_primitive::<Float64Type>();
        let speedup = batch.column(2).as_primitive::<Float64Type>();
        let efficiency = batch.column(3).as_primitive::<Float64Type>();
        for i in 0..batch.num_rows() {
            records.push(PerformanceRecord {
                scale: scale.value(i) as usize,
                duration_seconds: duration.value(i),
                speedup: speedup.value(i),
                efficiency: efficiency.value(i),
            });
        }
    }
    Ok(records)
}
