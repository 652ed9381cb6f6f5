//! Pipeline orchestration: validate a job, run it once per scale, derive
//! scaling metrics and persist everything under the job's result path.

pub mod orchestrator;
pub mod performance;
pub mod result;

pub use orchestrator::{PipelineOrchestrator, ScaleRun};
pub use performance::{
    read_performance_table, write_performance_table, PerformanceAnalyzer, PerformanceRecord,
};
pub use result::{build_result_path, scale_key, PipelineResult, ResultWriter, PERFORMANCE_FILE};
