use image::{GrayImage, RgbImage, imageops};

const SSIM_BLOCK: u32 = 8;
const C1: f64 = (0.01 * 255.0) * (0.01 * 255.0);
const C2: f64 = (0.03 * 255.0) * (0.03 * 255.0);

/// Decides whether two consecutive grayscale samples are near-identical.
/// Frames of different size are never similar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimilarityMetric {
    /// Similar when fewer than `max_changed_pixels` pixels differ at all.
    PixelDiff { max_changed_pixels: u64 },
    /// Similar when the mean block SSIM reaches `min_score`.
    Ssim { min_score: f64 },
}

impl SimilarityMetric {
    pub fn is_similar(&self, previous: &GrayImage, current: &GrayImage) -> bool {
        if previous.dimensions() != current.dimensions() {
            return false;
        }
        match *self {
            SimilarityMetric::PixelDiff { max_changed_pixels } => {
                changed_pixels(previous, current) < max_changed_pixels
            }
            SimilarityMetric::Ssim { min_score } => ssim(previous, current) >= min_score,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SimilarityMetric::PixelDiff { .. } => "pixel",
            SimilarityMetric::Ssim { .. } => "ssim",
        }
    }
}

pub fn to_gray(frame: &RgbImage) -> GrayImage {
    imageops::grayscale(frame)
}

/// Number of pixels whose intensity differs. Sizes must match.
pub fn changed_pixels(a: &GrayImage, b: &GrayImage) -> u64 {
    a.as_raw()
        .iter()
        .zip(b.as_raw())
        .filter(|(x, y)| x != y)
        .count() as u64
}

/// Mean SSIM over non-overlapping 8x8 blocks, in `[-1, 1]`; 1 for identical
/// images. Returns 0 for empty or differently sized images.
pub fn ssim(a: &GrayImage, b: &GrayImage) -> f64 {
    let (width, height) = a.dimensions();
    if (width, height) != b.dimensions() || width == 0 || height == 0 {
        return 0.0;
    }

    let mut total = 0.0;
    let mut blocks = 0u32;
    for y0 in (0..height).step_by(SSIM_BLOCK as usize) {
        for x0 in (0..width).step_by(SSIM_BLOCK as usize) {
            let w = SSIM_BLOCK.min(width - x0);
            let h = SSIM_BLOCK.min(height - y0);
            total += block_ssim(a, b, x0, y0, w, h);
            blocks += 1;
        }
    }
    total / blocks as f64
}

fn block_ssim(a: &GrayImage, b: &GrayImage, x0: u32, y0: u32, w: u32, h: u32) -> f64 {
    let n = (w * h) as f64;
    let (mut sum_a, mut sum_b) = (0.0, 0.0);
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            sum_a += a.get_pixel(x, y)[0] as f64;
            sum_b += b.get_pixel(x, y)[0] as f64;
        }
    }
    let (mean_a, mean_b) = (sum_a / n, sum_b / n);

    let (mut var_a, mut var_b, mut cov) = (0.0, 0.0, 0.0);
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            let da = a.get_pixel(x, y)[0] as f64 - mean_a;
            let db = b.get_pixel(x, y)[0] as f64 - mean_b;
            var_a += da * da;
            var_b += db * db;
            cov += da * db;
        }
    }
    let (var_a, var_b, cov) = (var_a / n, var_b / n, cov / n);

    ((2.0 * mean_a * mean_b + C1) * (2.0 * cov + C2))
        / ((mean_a * mean_a + mean_b * mean_b + C1) * (var_a + var_b + C2))
}
