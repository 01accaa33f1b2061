use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Cannot open video source {path}: {reason}")]
    OpenSource { path: String, reason: String },

    #[error("Cannot open video writer {path}: {reason}")]
    OpenSink { path: String, reason: String },

    #[error("Failed to read frame {index}: {reason}")]
    Read { index: u64, reason: String },

    #[error("Failed to write frame {index}: {reason}")]
    Write { index: u64, reason: String },

    #[error("Frame is {actual_width}x{actual_height}, writer expects {width}x{height}")]
    FrameSize {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Image codec error: {0}")]
    Codec(#[from] image::ImageError),

    #[error("Invalid base64 image: {0}")]
    Base64(#[from] base64::DecodeError),

    #[cfg(feature = "opencv")]
    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),
}
