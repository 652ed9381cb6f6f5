pub mod config;
pub mod dataset;
pub mod error;
pub mod job;

pub use config::Config;
pub use dataset::{DatasetDescriptor, DatasetFormat, DatasetResolver, ReadOptions};
pub use error::*;
pub use job::*;
