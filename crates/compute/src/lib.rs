//! Sized compute sessions over in-memory datasets, and the descriptive and
//! ML task engines that run inside them.

pub mod algorithms;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod loader;
pub mod tasks;

pub use dataset::Dataset;
pub use engine::{ComputeEngine, ComputeSession};
pub use error::ComputeError;
pub use tasks::{
    engine_for, AnalyticsTask, DescriptiveStatsEngine, MlTaskEngine, ScaleOutput, TaskEngine,
    TaskOutcome, TaskRegistry, EMPTY_DATASET,
};
