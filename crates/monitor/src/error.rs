use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Live source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Cannot spawn sampling thread: {0}")]
    Spawn(#[from] std::io::Error),
}
