use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Malformed request, job config, task list or scale list.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("dataset not found: {0}")]
    NotFound(String),

    #[error("unsupported dataset type: {0}")]
    UnsupportedFormat(String),

    /// Failure inside the compute engine during load or task execution.
    #[error("engine error: {0}")]
    Engine(String),

    #[error("storage error: {0}")]
    Storage(String),

    /// Scaling metrics cannot be derived (e.g. a zero-duration baseline).
    #[error("performance error: {0}")]
    Performance(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// True for errors caused by the caller's input rather than by the
    /// engine or the infrastructure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::Validation(_)
                | PipelineError::NotFound(_)
                | PipelineError::UnsupportedFormat(_)
        )
    }

    /// Short machine-readable kind, used in logs and API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation",
            PipelineError::NotFound(_) => "not_found",
            PipelineError::UnsupportedFormat(_) => "unsupported_format",
            PipelineError::Engine(_) => "engine",
            PipelineError::Storage(_) => "storage",
            PipelineError::Performance(_) => "performance",
            PipelineError::Io(_) => "io",
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
