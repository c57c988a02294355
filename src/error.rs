use thiserror::Error;

/// Errors that abort a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    #[error("training failed: {0}")]
    TrainingFailure(String),

    #[error("failed to write output: {0}")]
    Output(String),
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        PipelineError::Output(e.to_string())
    }
}

impl From<csv::Error> for PipelineError {
    fn from(e: csv::Error) -> Self {
        PipelineError::Output(e.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::Output(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
