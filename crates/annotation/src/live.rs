use crate::clock::{Clock, ElapsedTimer};
use crate::metrics::AnnotationMetrics;
use image::RgbImage;
use inference::SharedDetector;
use schema::{BoundingBoxDetection, Detection};
use std::sync::Arc;

/// Per-frame detection with timestamps relative to this annotator's
/// creation. A detector failure yields an empty frame, never an error.
pub struct LiveAnnotator {
    examination_id: String,
    detector: SharedDetector,
    timer: ElapsedTimer,
    metrics: AnnotationMetrics,
    mode: &'static str,
}

impl LiveAnnotator {
    pub fn new(
        examination_id: &str,
        detector: SharedDetector,
        clock: Arc<dyn Clock>,
        mode: &'static str,
    ) -> Self {
        Self {
            examination_id: examination_id.to_string(),
            detector,
            timer: ElapsedTimer::start(clock),
            metrics: AnnotationMetrics::new(),
            mode,
        }
    }

    pub fn annotate(&mut self, frame: &RgbImage) -> Vec<Detection> {
        let timestamp = self.timer.elapsed_secs();

        match run_detector(&self.detector, frame) {
            Ok(boxes) => boxes
                .iter()
                .map(|b| {
                    Detection::from_box(
                        &self.examination_id,
                        timestamp,
                        b,
                        frame.width(),
                        frame.height(),
                    )
                })
                .collect(),
            Err(e) => {
                tracing::warn!(
                    examination_id = %self.examination_id,
                    timestamp,
                    error = %e,
                    "Detection failed, frame left unannotated"
                );
                self.metrics.record_detector_failure(self.mode);
                Vec::new()
            }
        }
    }

    pub fn examination_id(&self) -> &str {
        &self.examination_id
    }
}

fn run_detector(
    detector: &SharedDetector,
    frame: &RgbImage,
) -> anyhow::Result<Vec<BoundingBoxDetection>> {
    let mut guard = detector
        .lock()
        .map_err(|_| anyhow::anyhow!("detector lock poisoned"))?;
    guard.detect(frame)
}
