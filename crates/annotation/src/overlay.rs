use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use schema::Detection;
use std::path::Path;

const PALETTE: [Rgb<u8>; 8] = [
    Rgb([0, 255, 0]),
    Rgb([255, 64, 64]),
    Rgb([64, 128, 255]),
    Rgb([255, 200, 0]),
    Rgb([255, 0, 255]),
    Rgb([0, 255, 255]),
    Rgb([255, 128, 0]),
    Rgb([160, 96, 255]),
];
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const LINE_THICKNESS: u32 = 2;
const FONT_SIZE: f32 = 16.0;

/// Draws detection boxes and `"<label> <confidence>"` captions.
///
/// Without a font only the caption background tab is drawn.
#[derive(Clone, Default)]
pub struct Overlay {
    font: Option<FontArc>,
}

impl Overlay {
    pub fn new(font: Option<FontArc>) -> Self {
        Self { font }
    }

    pub fn from_font_path(path: Option<&Path>) -> anyhow::Result<Self> {
        let font = match path {
            Some(p) => {
                let bytes = std::fs::read(p)
                    .map_err(|e| anyhow::anyhow!("Failed to read font {}: {}", p.display(), e))?;
                Some(FontArc::try_from_vec(bytes)?)
            }
            None => None,
        };
        Ok(Self { font })
    }

    pub fn caption(detection: &Detection) -> String {
        format!("{} {:.2}", detection.label, detection.confidence)
    }

    /// Annotated copy of `frame`; the input is left untouched.
    pub fn draw(&self, frame: &RgbImage, detections: &[Detection]) -> RgbImage {
        let mut out = frame.clone();
        for detection in detections {
            self.draw_one(&mut out, detection);
        }
        out
    }

    fn draw_one(&self, img: &mut RgbImage, det: &Detection) {
        let color = label_color(&det.label);
        let (w, h) = (det.width(), det.height());

        for t in 0..LINE_THICKNESS {
            let inner_w = w.saturating_sub(2 * t);
            let inner_h = h.saturating_sub(2 * t);
            if inner_w > 0 && inner_h > 0 {
                let rect = Rect::at(det.x1 + t as i32, det.y1 + t as i32).of_size(inner_w, inner_h);
                draw_hollow_rect_mut(img, rect, color);
            }
        }

        let text = Self::caption(det);
        let tab_w = ((text.len() as f32 * FONT_SIZE * 0.6) as u32).max(1);
        let tab_h = (FONT_SIZE * 1.25) as u32;
        // Above the box when there is room, inside it otherwise
        let tab_y = if det.y1 >= tab_h as i32 {
            det.y1 - tab_h as i32
        } else {
            det.y1
        };

        draw_filled_rect_mut(img, Rect::at(det.x1, tab_y).of_size(tab_w, tab_h), color);

        if let Some(font) = &self.font {
            draw_text_mut(
                img,
                TEXT_COLOR,
                det.x1 + 2,
                tab_y + 1,
                PxScale::from(FONT_SIZE),
                font,
                &text,
            );
        }
    }
}

fn label_color(label: &str) -> Rgb<u8> {
    let hash = label
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    PALETTE[hash as usize % PALETTE.len()]
}
