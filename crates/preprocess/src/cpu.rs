use crate::{DEFAULT_INPUT_SIZE, LetterboxTransform, Preprocess, PreprocessResult};
use common::span;
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use image::RgbImage;
use ndarray::{Array, IxDyn};

const LETTERBOX_COLOR: u8 = 114;
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Letterbox resize into a reusable buffer, then ImageNet normalization into
/// a planar tensor.
pub struct CpuPreProcessor {
    pub input_size: (u32, u32),
    letterboxed_buffer: Vec<u8>,
    resizer: Resizer,
}

impl CpuPreProcessor {
    pub fn new(input_size: (u32, u32)) -> Self {
        Self {
            input_size,
            letterboxed_buffer: vec![LETTERBOX_COLOR; (input_size.0 * input_size.1 * 3) as usize],
            resizer: Resizer::new(),
        }
    }

    fn letterbox(&mut self, image: &RgbImage) -> anyhow::Result<LetterboxTransform> {
        let _s = span!("letterbox");

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            anyhow::bail!("Cannot preprocess empty {}x{} frame", width, height);
        }

        let (input_w, input_h) = self.input_size;
        let scale = (input_w as f32 / width as f32).min(input_h as f32 / height as f32);
        let new_width = ((width as f32 * scale) as u32).clamp(1, input_w);
        let new_height = ((height as f32 * scale) as u32).clamp(1, input_h);

        let offset_x = (input_w - new_width) / 2;
        let offset_y = (input_h - new_height) / 2;

        let src = ImageRef::new(width, height, image.as_raw(), PixelType::U8x3)?;
        let mut resized = Image::new(new_width, new_height, PixelType::U8x3);

        self.resizer.resize(
            &src,
            &mut resized,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        )?;

        self.letterboxed_buffer.fill(LETTERBOX_COLOR);

        let row_bytes = (new_width * 3) as usize;
        let stride = (input_w * 3) as usize;
        for (y, src_row) in resized.buffer().chunks_exact(row_bytes).enumerate() {
            let dst = (y + offset_y as usize) * stride + (offset_x * 3) as usize;
            self.letterboxed_buffer[dst..dst + row_bytes].copy_from_slice(src_row);
        }

        Ok(LetterboxTransform {
            orig_width: width,
            orig_height: height,
            input_width: input_w,
            input_height: input_h,
            scale,
            offset_x: offset_x as f32,
            offset_y: offset_y as f32,
        })
    }

    fn normalize(&self) -> anyhow::Result<Array<f32, IxDyn>> {
        let _s = span!("normalize");

        let (width, height) = (self.input_size.0 as usize, self.input_size.1 as usize);
        let spatial = width * height;
        let mut output = vec![0.0f32; 3 * spatial];

        for (i, px) in self.letterboxed_buffer.chunks_exact(3).enumerate() {
            for c in 0..3 {
                let v = px[c] as f32 / 255.0;
                output[i + c * spatial] = (v - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            }
        }

        Ok(Array::from_shape_vec(IxDyn(&[1, 3, height, width]), output)?)
    }
}

impl Default for CpuPreProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_SIZE)
    }
}

impl Preprocess for CpuPreProcessor {
    fn preprocess(&mut self, image: &RgbImage) -> anyhow::Result<PreprocessResult> {
        let transform = self.letterbox(image)?;
        let tensor = self.normalize()?;
        Ok(PreprocessResult { tensor, transform })
    }

    fn input_size(&self) -> (u32, u32) {
        self.input_size
    }
}
