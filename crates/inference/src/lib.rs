pub mod backend;
pub mod config;
pub mod detector;
pub mod labels;
pub mod processing;

pub use backend::{InferenceBackend, InferenceOutput};
pub use config::{ExecutionProvider, InferenceConfig};
pub use detector::{DetrDetector, ObjectDetector, SharedDetector, build_detector, shared};
pub use labels::ClassLabels;
