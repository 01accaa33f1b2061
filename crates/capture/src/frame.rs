use image::RgbImage;
use std::time::Duration;

/// A decoded RGB frame with its position in the stream.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub index: u64,
    /// Presentation time derived from the stream frame rate.
    pub timestamp: Duration,
}

impl Frame {
    pub fn new(image: RgbImage, index: u64, fps: f64) -> Self {
        let timestamp = if fps > 0.0 {
            Duration::from_secs_f64(index as f64 / fps)
        } else {
            Duration::ZERO
        };
        Self {
            image,
            index,
            timestamp,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoProperties {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}
