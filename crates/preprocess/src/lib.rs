pub mod cpu;

use image::RgbImage;
use ndarray::{Array, IxDyn};

pub use cpu::CpuPreProcessor;

/// Model input resolution used when none is configured.
pub const DEFAULT_INPUT_SIZE: (u32, u32) = (512, 512);

/// Geometry of one letterbox resize, needed to map model-space boxes back
/// onto the source frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxTransform {
    pub orig_width: u32,
    pub orig_height: u32,
    pub input_width: u32,
    pub input_height: u32,
    /// Scale factor applied during letterboxing
    pub scale: f32,
    /// X offset from letterboxing (in pixels)
    pub offset_x: f32,
    /// Y offset from letterboxing (in pixels)
    pub offset_y: f32,
}

impl LetterboxTransform {
    /// Map a point in model-input pixels to source-frame pixels, clamped to
    /// the frame.
    #[inline]
    pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let ox = ((x - self.offset_x) / self.scale).clamp(0.0, self.orig_width as f32);
        let oy = ((y - self.offset_y) / self.scale).clamp(0.0, self.orig_height as f32);
        (ox, oy)
    }
}

/// `[1, 3, H, W]` normalized tensor plus the transform that produced it.
#[derive(Debug)]
pub struct PreprocessResult {
    pub tensor: Array<f32, IxDyn>,
    pub transform: LetterboxTransform,
}

/// Trait for image preprocessing implementations
pub trait Preprocess: Send {
    fn preprocess(&mut self, image: &RgbImage) -> anyhow::Result<PreprocessResult>;

    /// Get the input size this preprocessor targets
    fn input_size(&self) -> (u32, u32);
}
