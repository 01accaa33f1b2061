//! Freeze/liveness monitoring of a live video feed.

pub mod config;
pub mod detector;
pub mod error;
pub mod metrics;
pub mod service;
pub mod similarity;
pub mod state_machine;
pub mod subscribers;

pub use config::MonitorConfig;
pub use detector::FreezeDetector;
pub use error::MonitorError;
pub use service::{FreezeMonitor, SourceOpener};
pub use similarity::{SimilarityMetric, changed_pixels, ssim, to_gray};
pub use state_machine::{FreezeContext, FreezeState};
pub use subscribers::SubscriberId;
