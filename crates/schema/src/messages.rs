use crate::Detection;
use serde::{Deserialize, Serialize};

/// Response of a completed annotation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationResult {
    pub annotated_video_filename: String,
    pub annotated_video_path: String,
    pub detections: Vec<Detection>,
}

/// Per-frame entry pushed over the live detection channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDetection {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub label: String,
    pub confidence: f32,
    pub timestamp: f64,
}

impl From<&Detection> for FrameDetection {
    fn from(d: &Detection) -> Self {
        Self {
            x1: d.x1,
            y1: d.y1,
            x2: d.x2,
            y2: d.y2,
            label: d.label.clone(),
            confidence: d.confidence,
            timestamp: d.timestamp,
        }
    }
}

/// `{ "detections": [...] }`, one per processed frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionMessage {
    pub detections: Vec<FrameDetection>,
}

impl DetectionMessage {
    pub fn from_detections(detections: &[Detection]) -> Self {
        Self {
            detections: detections.iter().map(FrameDetection::from).collect(),
        }
    }
}

/// Freeze state as broadcast to subscribers and returned by status reads.
/// `screenshot` is a base64 JPEG, present only while frozen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FreezeStatus {
    pub freeze: bool,
    pub screenshot: Option<String>,
}
