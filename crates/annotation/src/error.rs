use capture::CaptureError;
use store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("Examination {0} not found")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Processing failed: {0}")]
    Processing(String),

    #[error("Examination {0} already has an annotation run in progress")]
    Busy(String),

    #[error("Live source unavailable: {0}")]
    SourceUnavailable(String),
}

impl AnnotationError {
    pub(crate) fn invalid_input(err: CaptureError) -> Self {
        Self::InvalidInput(err.to_string())
    }

    pub(crate) fn processing(err: impl std::fmt::Display) -> Self {
        Self::Processing(err.to_string())
    }
}

impl From<StoreError> for AnnotationError {
    fn from(err: StoreError) -> Self {
        Self::Processing(err.to_string())
    }
}
