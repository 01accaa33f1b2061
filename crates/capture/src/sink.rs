use crate::CaptureError;
use image::RgbImage;

/// Ordered writer for annotated frames.
pub trait FrameSink: Send {
    fn write(&mut self, image: &RgbImage) -> Result<(), CaptureError>;

    /// Flush and close the output, returning the number of frames written.
    fn finish(&mut self) -> Result<u64, CaptureError>;
}
