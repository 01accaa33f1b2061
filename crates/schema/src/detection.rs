use serde::{Deserialize, Serialize};

/// Raw detector output in frame pixel space, before any clipping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBoxDetection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub label: String,
    pub confidence: f32,
}

impl BoundingBoxDetection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, label: impl Into<String>, confidence: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            label: label.into(),
            confidence,
        }
    }
}

/// One labeled box observed in one frame at `timestamp` seconds since the
/// start of the run that produced it.
///
/// Built through [`Detection::from_box`], which guarantees `x1 <= x2`,
/// `y1 <= y2`, coordinates inside the frame and `confidence` in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub examination_id: String,
    pub timestamp: f64,
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub label: String,
    pub confidence: f32,
}

impl Detection {
    /// Round and clip a detector box to a `width` x `height` frame.
    pub fn from_box(
        examination_id: &str,
        timestamp: f64,
        bbox: &BoundingBoxDetection,
        width: u32,
        height: u32,
    ) -> Self {
        let (x1, x2) = ordered(
            clip(bbox.x1, width),
            clip(bbox.x2, width),
        );
        let (y1, y2) = ordered(
            clip(bbox.y1, height),
            clip(bbox.y2, height),
        );

        let confidence = if bbox.confidence.is_nan() {
            0.0
        } else {
            bbox.confidence.clamp(0.0, 1.0)
        };

        Self {
            examination_id: examination_id.to_string(),
            timestamp,
            x1,
            y1,
            x2,
            y2,
            label: bbox.label.clone(),
            confidence,
        }
    }

    pub fn width(&self) -> u32 {
        (self.x2 - self.x1) as u32
    }

    pub fn height(&self) -> u32 {
        (self.y2 - self.y1) as u32
    }
}

#[inline]
fn clip(v: f32, limit: u32) -> i32 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, limit as f32) as i32
}

#[inline]
fn ordered(a: i32, b: i32) -> (i32, i32) {
    if a <= b { (a, b) } else { (b, a) }
}
