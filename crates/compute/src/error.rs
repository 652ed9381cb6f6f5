use scaleout_core::PipelineError;

/// Error type for dataset loading and task execution.
#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session error: {0}")]
    Session(String),
    #[error("Task {task} failed: {reason}")]
    Failed { task: String, reason: String },
    #[error("Unknown column: {0}")]
    UnknownColumn(String),
}

impl ComputeError {
    pub fn failed(task: impl Into<String>, reason: impl Into<String>) -> Self {
        ComputeError::Failed {
            task: task.into(),
            reason: reason.into(),
        }
    }
}

impl From<ComputeError> for PipelineError {
    fn from(err: ComputeError) -> Self {
        PipelineError::Engine(err.to_string())
    }
}
