pub mod codec;
pub mod config;
pub mod error;
pub mod frame;
pub mod image_sequence;
#[cfg(feature = "opencv")]
pub mod opencv_backend;
pub mod sink;
pub mod source;

use std::sync::Arc;

pub use codec::{decode_base64_image, decode_image, encode_jpeg, encode_screenshot};
pub use config::CaptureConfig;
pub use error::CaptureError;
pub use frame::{Frame, VideoProperties};
pub use image_sequence::ImageSequenceBackend;
#[cfg(feature = "opencv")]
pub use opencv_backend::OpenCvBackend;
pub use sink::FrameSink;
pub use source::{FrameSource, VideoBackend};

/// Container-file backend when built with `opencv`, image sequences otherwise.
pub fn default_backend(config: &CaptureConfig) -> Arc<dyn VideoBackend> {
    #[cfg(feature = "opencv")]
    {
        let _ = config;
        Arc::new(OpenCvBackend::new())
    }
    #[cfg(not(feature = "opencv"))]
    {
        Arc::new(ImageSequenceBackend::new(config.source_fps))
    }
}
