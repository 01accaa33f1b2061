//! Records shared between the detection engine, the annotation pipeline, the
//! freeze monitor, the store and the gateway.

mod detection;
mod examination;
mod messages;

pub use detection::{BoundingBoxDetection, Detection};
pub use examination::Examination;
pub use messages::{AnnotationResult, DetectionMessage, FrameDetection, FreezeStatus};
