//! Video annotation: detector-driven per-frame annotation of stored videos
//! and live frame streams, with timeline persistence.

pub mod batcher;
pub mod clock;
pub mod error;
pub mod live;
pub mod metrics;
pub mod overlay;
pub mod pipeline;
pub mod run;
pub mod stream;

pub use batcher::DetectionBatcher;
pub use clock::{Clock, ElapsedTimer, SteppingClock, SystemClock};
pub use error::AnnotationError;
pub use live::LiveAnnotator;
pub use overlay::Overlay;
pub use pipeline::AnnotationPipeline;
pub use run::{AnnotationRun, RunState};
pub use stream::{spawn_camera_stream, spawn_frame_stream};
